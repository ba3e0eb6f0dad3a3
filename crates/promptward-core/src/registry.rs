//! # Scanner Registry
//!
//! A named, case-insensitive collection of scanners run as one batch.
//! Selection is forward compatible: configuration may name scanners that
//! this build does not carry, and those names are silently skipped so a
//! config rollout never has to be lock-stepped with a binary rollout.
//!
//! ## Failure Containment
//!
//! A scanner that returns an error contributes a non-detecting result
//! carrying `{"error": <code>, "error_detail": <message>}` in its
//! metadata. The batch always completes; the aggregation layer decides
//! what an inconclusive result means for the request.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use promptward_scanner::{
    Metadata, OutputScanner, RiskLevel, ScanError, ScanOptions, ScanResult, Scanner,
};

/// Converts a scanner failure into the error-result contract.
fn error_result(error: &ScanError, started: Instant) -> ScanResult {
    let mut metadata = Metadata::new();
    metadata.insert("error".to_string(), Value::from(error.code()));
    metadata.insert("error_detail".to_string(), Value::from(error.to_string()));

    ScanResult {
        is_threat_detected: false,
        confidence_score: 0.0,
        risk_level: RiskLevel::Low,
        metadata: Some(metadata),
        processing_time: started.elapsed(),
    }
}

/// Lowercased selection set; `None` means "run everything".
fn selection_set(selected: Option<&[&str]>) -> Option<HashSet<String>> {
    match selected {
        None => None,
        Some([]) => None,
        Some(names) => Some(names.iter().map(|n| n.to_lowercase()).collect()),
    }
}

/// A registry of input scanners.
///
/// Holds scanners in registration order and indexes them by lowercased
/// name. Lives for the host process; scanners are shared handles so the
/// registry itself is cheap to clone.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    scanners: Vec<Arc<dyn Scanner>>,
    index: HashMap<String, usize>,
}

impl ScannerRegistry {
    /// Builds a registry from scanners in invocation order.
    ///
    /// A duplicate name (case-insensitive) keeps the first registration
    /// and logs the discarded one.
    pub fn new(scanners: Vec<Arc<dyn Scanner>>) -> Self {
        let mut registry = Self::default();
        for scanner in scanners {
            registry.register(scanner);
        }
        registry
    }

    /// Adds one scanner; first registration of a name wins.
    pub fn register(&mut self, scanner: Arc<dyn Scanner>) {
        let key = scanner.name().to_lowercase();
        if self.index.contains_key(&key) {
            warn!(name = %scanner.name(), "duplicate scanner name ignored");
            return;
        }
        self.index.insert(key, self.scanners.len());
        self.scanners.push(scanner);
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// Whether a scanner is registered under this name, case-insensitively.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Number of registered scanners.
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    /// True when no scanners are registered.
    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Runs the selected scanners over one text.
    ///
    /// `None` or an empty selection runs all scanners; unknown names are
    /// skipped. Scanners run sequentially in registration order; results
    /// are keyed by canonical scanner name.
    pub fn scan(
        &self,
        text: &str,
        selected: Option<&[&str]>,
        options: &ScanOptions,
    ) -> BTreeMap<String, ScanResult> {
        let selection = selection_set(selected);
        let mut results = BTreeMap::new();

        for scanner in &self.scanners {
            let name = scanner.name();
            if let Some(selection) = &selection {
                if !selection.contains(&name.to_lowercase()) {
                    continue;
                }
            }

            let started = Instant::now();
            let result = match scanner.scan(text, options) {
                Ok(result) => result,
                Err(error) => {
                    warn!(scanner = %name, %error, "scanner failed, recording error result");
                    error_result(&error, started)
                }
            };
            results.insert(name.to_string(), result);
        }

        debug!(scanners = results.len(), "input scan batch complete");
        results
    }
}

/// A registry of output scanners; same shape over `(prompt, output)`.
#[derive(Clone, Default)]
pub struct OutputScannerRegistry {
    scanners: Vec<Arc<dyn OutputScanner>>,
    index: HashMap<String, usize>,
}

impl OutputScannerRegistry {
    /// Builds a registry from scanners in invocation order.
    pub fn new(scanners: Vec<Arc<dyn OutputScanner>>) -> Self {
        let mut registry = Self::default();
        for scanner in scanners {
            registry.register(scanner);
        }
        registry
    }

    /// Adds one scanner; first registration of a name wins.
    pub fn register(&mut self, scanner: Arc<dyn OutputScanner>) {
        let key = scanner.name().to_lowercase();
        if self.index.contains_key(&key) {
            warn!(name = %scanner.name(), "duplicate scanner name ignored");
            return;
        }
        self.index.insert(key, self.scanners.len());
        self.scanners.push(scanner);
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// Number of registered scanners.
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    /// True when no scanners are registered.
    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Runs the selected scanners over one `(prompt, output)` pair.
    pub fn scan(
        &self,
        prompt: &str,
        output: &str,
        selected: Option<&[&str]>,
        options: &ScanOptions,
    ) -> BTreeMap<String, ScanResult> {
        let selection = selection_set(selected);
        let mut results = BTreeMap::new();

        for scanner in &self.scanners {
            let name = scanner.name();
            if let Some(selection) = &selection {
                if !selection.contains(&name.to_lowercase()) {
                    continue;
                }
            }

            let started = Instant::now();
            let result = match scanner.scan(prompt, output, options) {
                Ok(result) => result,
                Err(error) => {
                    warn!(scanner = %name, %error, "output scanner failed, recording error result");
                    error_result(&error, started)
                }
            };
            results.insert(name.to_string(), result);
        }

        debug!(scanners = results.len(), "output scan batch complete");
        results
    }
}
