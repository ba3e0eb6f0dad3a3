//! # Verdict Aggregation
//!
//! Folds a batch of per-scanner results into the single decision an
//! admission layer acts on. The fold is pure and ordering-independent: it
//! consumes a name-keyed map, so two hosts collecting the same results in
//! different orders reach the same decision.
//!
//! ## Decision Table
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | nothing detected, no scanner errors | `Allow` |
//! | nothing detected, some scanner errored | `Review` |
//! | detected, highest severity ≥ `Medium` | `Block` |
//! | detected, highest severity below `Medium` | `Review` |
//!
//! An errored scanner is inconclusive, not safe; it can keep a request
//! from sailing through but never blocks on its own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use promptward_scanner::{Metadata, ScanResult};

/// Finding code for a detecting scanner.
pub const CODE_DETECTED: &str = "DETECTED";
/// Finding code for a clean scanner.
pub const CODE_CLEAR: &str = "CLEAR";

const MESSAGE_DETECTED: &str = "Potential prompt injection detected";
const MESSAGE_CLEAR: &str = "No threat detected";

/// Severity of a single finding, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Severity {
    /// Nothing detected.
    Info,
    /// Detected at low confidence.
    Low,
    /// Detected at moderate confidence.
    Medium,
    /// Detected at high confidence.
    High,
    /// Reserved for externally confirmed incidents.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Host-visible verdict over the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Forward the request.
    Allow,
    /// Hold for human or secondary review.
    Review,
    /// Reject the request.
    Block,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Review => write!(f, "review"),
            Decision::Block => write!(f, "block"),
        }
    }
}

/// One scanner's contribution to the aggregate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Canonical scanner name.
    pub scanner: String,
    /// `DETECTED` or `CLEAR`.
    pub code: String,
    /// Fixed human-readable message for the code.
    pub message: String,
    /// Severity derived from the scanner's flag and score.
    pub severity: Severity,
    /// Confidence score the scanner reported.
    pub confidence_score: f32,
    /// Pass-through diagnostic metadata.
    pub metadata: Option<Metadata>,
}

/// The aggregate verdict and its supporting findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// The admission decision.
    pub decision: Decision,
    /// Whether any scanner detected a threat.
    pub detected: bool,
    /// Highest confidence score across scanners (0 when empty).
    pub max_score: f32,
    /// Highest severity across findings (`Info` when empty).
    pub highest_severity: Severity,
    /// One finding per scanner, ordered by scanner name.
    pub findings: Vec<Finding>,
}

/// Derives a finding severity from one scan result.
pub fn severity_of(result: &ScanResult) -> Severity {
    if !result.is_threat_detected {
        Severity::Info
    } else if result.confidence_score >= 0.85 {
        Severity::High
    } else if result.confidence_score >= 0.6 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn carries_error(result: &ScanResult) -> bool {
    result
        .metadata
        .as_ref()
        .is_some_and(|m| m.contains_key("error"))
}

/// Folds per-scanner results into an [`AggregateReport`].
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use promptward_core::aggregate::{aggregate, Decision};
/// use promptward_scanner::ScanResult;
///
/// let mut results = BTreeMap::new();
/// results.insert("prompt_injection".to_string(), ScanResult::from_score(0.97, 0.5));
///
/// let report = aggregate(&results);
/// assert_eq!(report.decision, Decision::Block);
/// assert!(report.detected);
/// ```
pub fn aggregate(results: &BTreeMap<String, ScanResult>) -> AggregateReport {
    let mut detected = false;
    let mut errored = false;
    let mut max_score = 0.0f32;
    let mut highest_severity = Severity::Info;
    let mut findings = Vec::with_capacity(results.len());

    for (name, result) in results {
        detected |= result.is_threat_detected;
        errored |= carries_error(result);
        max_score = max_score.max(result.confidence_score);

        let severity = severity_of(result);
        highest_severity = highest_severity.max(severity);

        let (code, message) = if result.is_threat_detected {
            (CODE_DETECTED, MESSAGE_DETECTED)
        } else {
            (CODE_CLEAR, MESSAGE_CLEAR)
        };

        findings.push(Finding {
            scanner: name.clone(),
            code: code.to_string(),
            message: message.to_string(),
            severity,
            confidence_score: result.confidence_score,
            metadata: result.metadata.clone(),
        });
    }

    let decision = if detected {
        if highest_severity >= Severity::Medium {
            Decision::Block
        } else {
            Decision::Review
        }
    } else if errored {
        // Inconclusive is not safe: hold for review instead of forwarding.
        Decision::Review
    } else {
        Decision::Allow
    };

    AggregateReport {
        decision,
        detected,
        max_score,
        highest_severity,
        findings,
    }
}
