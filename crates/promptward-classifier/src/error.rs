//! Error types for the classifier runtime.

use thiserror::Error;

/// Errors raised while loading or running the classification graph.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The graph file could not be loaded into a session.
    #[error("failed to load classifier graph: {0}")]
    Load(String),

    /// The graph's inputs or outputs do not fit the expected signature.
    #[error("unsupported graph signature: {0}")]
    Signature(String),

    /// The session run itself failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The run succeeded but returned a tensor the scorer cannot use.
    #[error("malformed output tensor: {0}")]
    MalformedOutput(String),
}
