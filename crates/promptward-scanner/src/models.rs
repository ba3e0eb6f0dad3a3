//! # Scan Result Contract
//!
//! The types every scanner speaks: per-call options, the structured
//! verdict, and the error taxonomy. All of them serialize with Serde so
//! verdicts can flow straight into audit logs.
//!
//! ## Derivation Rules
//!
//! The detection flag and risk level are derived from the score in exactly
//! one place, [`ScanResult::from_score`]:
//!
//! | Condition | `is_threat_detected` | `risk_level` |
//! |-----------|---------------------|--------------|
//! | `score < threshold` | `false` | `Low` |
//! | `score ≥ threshold`, `score < 0.85` | `true` | `Medium` |
//! | `score ≥ threshold`, `score ≥ 0.85` | `true` | `High` |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic metadata attached to a scan result.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Coarse risk bucket over the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Nothing detected.
    Low,
    /// Detected below high confidence.
    Medium,
    /// Detected at high confidence.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Per-call overrides; unset fields take the scanner's configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Detection threshold in [0,1]. Scanner default when `None`.
    pub threshold: Option<f32>,

    /// Whether the result carries diagnostic metadata.
    pub include_metadata: bool,

    /// Sequence-length override for the tokenizer. Scanner default when
    /// `None`.
    pub max_token_length: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threshold: None,
            include_metadata: true,
            max_token_length: None,
        }
    }
}

impl ScanOptions {
    /// Sets an explicit detection threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Disables diagnostic metadata on the result.
    pub fn without_metadata(mut self) -> Self {
        self.include_metadata = false;
        self
    }

    /// Sets an explicit sequence-length cap.
    pub fn with_max_token_length(mut self, max_token_length: usize) -> Self {
        self.max_token_length = Some(max_token_length);
        self
    }
}

/// The structured verdict a scanner returns for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Whether the confidence score reached the effective threshold.
    pub is_threat_detected: bool,

    /// Calibrated probability of an injection attempt, in [0,1].
    pub confidence_score: f32,

    /// Coarse bucket over the confidence score.
    pub risk_level: RiskLevel,

    /// Diagnostic metadata; `None` when the caller opted out.
    pub metadata: Option<Metadata>,

    /// Wall-clock duration of the scan call.
    pub processing_time: Duration,
}

impl ScanResult {
    /// Confidence at or above which a detection is high risk.
    pub const HIGH_RISK_CONFIDENCE: f32 = 0.85;

    /// Builds a result from a score and threshold, deriving the flag and
    /// risk level per the contract. Metadata and timing are filled by the
    /// caller.
    pub fn from_score(confidence_score: f32, threshold: f32) -> Self {
        let is_threat_detected = confidence_score >= threshold;
        let risk_level = if !is_threat_detected {
            RiskLevel::Low
        } else if confidence_score >= Self::HIGH_RISK_CONFIDENCE {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        Self {
            is_threat_detected,
            confidence_score,
            risk_level,
            metadata: None,
            processing_time: Duration::ZERO,
        }
    }

    /// Attaches diagnostic metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Records the wall-clock cost of the call.
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = elapsed;
        self
    }
}

/// Errors a scanner surfaces to its direct caller.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The input was rejected at the boundary (for byte-level hosts:
    /// non-UTF-8 payloads; for options: unusable overrides).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation needed the tokenizer but none is configured.
    #[error("tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// The classifier ran and failed. Never silently downgraded.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Anything else.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ScanError {
    /// Short stable identifier for logs and error metadata.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidInput(_) => "invalid_input",
            ScanError::TokenizerUnavailable(_) => "tokenizer_unavailable",
            ScanError::InferenceFailed(_) => "inference_failed",
            ScanError::InternalError(_) => "internal_error",
        }
    }
}
