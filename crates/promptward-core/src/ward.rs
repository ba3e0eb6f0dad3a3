//! The unified admission facade.
//!
//! [`Ward`] is the single object a host wires in: it owns an input
//! registry (and optionally an output registry), runs a batch, and folds
//! the results into one [`AggregateReport`]. The report's `detected`,
//! `highest_severity`, and `max_score` fields are the advisory signals a
//! boundary typically surfaces to callers.

use std::sync::Arc;

use tracing::{debug, info};

use promptward_scanner::{OutputScanner, ScanOptions, Scanner};

use crate::aggregate::{aggregate, AggregateReport};
use crate::registry::{OutputScannerRegistry, ScannerRegistry};

/// Builder assembling a [`Ward`] from individual scanners or registries.
#[derive(Default)]
pub struct WardBuilder {
    inputs: ScannerRegistry,
    outputs: OutputScannerRegistry,
}

impl WardBuilder {
    /// Registers an input scanner.
    pub fn scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.inputs.register(scanner);
        self
    }

    /// Registers an output scanner.
    pub fn output_scanner(mut self, scanner: Arc<dyn OutputScanner>) -> Self {
        self.outputs.register(scanner);
        self
    }

    /// Replaces the input registry wholesale.
    pub fn input_registry(mut self, registry: ScannerRegistry) -> Self {
        self.inputs = registry;
        self
    }

    /// Replaces the output registry wholesale.
    pub fn output_registry(mut self, registry: OutputScannerRegistry) -> Self {
        self.outputs = registry;
        self
    }

    /// Finishes the facade.
    pub fn build(self) -> Ward {
        info!(
            input_scanners = self.inputs.len(),
            output_scanners = self.outputs.len(),
            "ward assembled"
        );
        Ward {
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}

/// Admission facade over the scanning pipeline.
pub struct Ward {
    inputs: ScannerRegistry,
    outputs: OutputScannerRegistry,
}

impl Ward {
    /// Starts an empty builder.
    pub fn builder() -> WardBuilder {
        WardBuilder::default()
    }

    /// The input registry, for hosts that run scanners directly.
    pub fn input_registry(&self) -> &ScannerRegistry {
        &self.inputs
    }

    /// The output registry.
    pub fn output_registry(&self) -> &OutputScannerRegistry {
        &self.outputs
    }

    /// Runs every input scanner over the text and aggregates.
    pub fn analyze(&self, text: &str, options: &ScanOptions) -> AggregateReport {
        self.analyze_selected(text, None, options)
    }

    /// Runs a selected subset of input scanners and aggregates.
    pub fn analyze_selected(
        &self,
        text: &str,
        selected: Option<&[&str]>,
        options: &ScanOptions,
    ) -> AggregateReport {
        let results = self.inputs.scan(text, selected, options);
        let report = aggregate(&results);
        debug!(
            decision = %report.decision,
            detected = report.detected,
            max_score = report.max_score,
            "input analysis complete"
        );
        report
    }

    /// Runs every output scanner over the pair and aggregates.
    pub fn analyze_output(
        &self,
        prompt: &str,
        output: &str,
        options: &ScanOptions,
    ) -> AggregateReport {
        let results = self.outputs.scan(prompt, output, None, options);
        let report = aggregate(&results);
        debug!(
            decision = %report.decision,
            detected = report.detected,
            "output analysis complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Decision;
    use promptward_scanner::{Result, ScanResult};

    struct FixedScanner(&'static str, f32);

    impl Scanner for FixedScanner {
        fn name(&self) -> &str {
            self.0
        }

        fn scan(&self, _text: &str, options: &ScanOptions) -> Result<ScanResult> {
            Ok(ScanResult::from_score(
                self.1,
                options.threshold.unwrap_or(0.5),
            ))
        }
    }

    #[test]
    fn test_empty_ward_allows() {
        let ward = Ward::builder().build();
        let report = ward.analyze("anything", &ScanOptions::default());
        assert_eq!(report.decision, Decision::Allow);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_ward_blocks_on_detection() {
        let ward = Ward::builder()
            .scanner(Arc::new(FixedScanner("hot", 0.96)))
            .scanner(Arc::new(FixedScanner("cold", 0.05)))
            .build();

        let report = ward.analyze("text", &ScanOptions::default());
        assert_eq!(report.decision, Decision::Block);
        assert_eq!(report.findings.len(), 2);
    }

    #[test]
    fn test_ward_selection() {
        let ward = Ward::builder()
            .scanner(Arc::new(FixedScanner("hot", 0.96)))
            .scanner(Arc::new(FixedScanner("cold", 0.05)))
            .build();

        let report =
            ward.analyze_selected("text", Some(&["cold"]), &ScanOptions::default());
        assert_eq!(report.decision, Decision::Allow);
        assert_eq!(report.findings.len(), 1);
    }
}
