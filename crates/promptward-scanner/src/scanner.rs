//! Scanner capability traits.
//!
//! Two kinds share one result contract: input scanners look at a prompt on
//! its way in, output scanners look at a model response in the context of
//! the prompt that produced it. Both are `Send + Sync`; implementations
//! are shared-immutable after construction so one instance can serve any
//! number of workers. Calls run to completion on the calling thread; hosts
//! with async façades offload to a worker pool.

use crate::models::{ScanOptions, ScanResult};
use crate::Result;

/// A detector over inbound text.
pub trait Scanner: Send + Sync {
    /// Canonical name the registry indexes this scanner under.
    fn name(&self) -> &str;

    /// Scans one text and returns the structured verdict.
    ///
    /// # Errors
    ///
    /// Implementations surface failures as [`ScanError`](crate::ScanError);
    /// they never panic on hostile input.
    fn scan(&self, text: &str, options: &ScanOptions) -> Result<ScanResult>;
}

/// A detector over `(prompt, output)` pairs.
pub trait OutputScanner: Send + Sync {
    /// Canonical name the registry indexes this scanner under.
    fn name(&self) -> &str;

    /// Scans a model output given the prompt that produced it.
    ///
    /// # Errors
    ///
    /// As for [`Scanner::scan`].
    fn scan(&self, prompt: &str, output: &str, options: &ScanOptions) -> Result<ScanResult>;
}
