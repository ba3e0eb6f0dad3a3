//! # Promptward Classifier - DeBERTa-v3 Inference Runtime
//!
//! Executes the exported injection-classification graph on encoded
//! sequences and converts the two-logit output into a calibrated
//! probability of class 1 (injection).
//!
//! ## Graph Contract
//!
//! | Binding | Shape | Type |
//! |---------|-------|------|
//! | `input_ids` | `[1, max_len]` | `int64` |
//! | `attention_mask` | `[1, max_len]` | `int64` |
//! | `logits` | `[1, 2]` | `float32` |
//!
//! Exports differ in how they name these bindings, so the loader resolves
//! them at load time: canonical names first, positional binding (first two
//! inputs, first output) otherwise.
//!
//! ## Thread Safety
//!
//! One [`DebertaClassifier`] may be shared across parallel scorers; the
//! session is read-only after construction and concurrent `score` calls
//! are permitted. Per-call tensors are allocated fresh.
//!
//! ## Availability
//!
//! The classifier is a capability, not a requirement: when the graph file
//! is missing or unreadable the scanner layer falls back to heuristics.
//! Load failures are reported as errors here and downgraded there.

mod error;
mod runtime;

pub use error::ClassifierError;
pub use runtime::{softmax2, DebertaClassifier};

/// Result type for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;
