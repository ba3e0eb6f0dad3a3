//! Error types for the tokenization subsystem.

use thiserror::Error;

/// Errors raised while parsing a binary SentencePiece model.
#[derive(Debug, Error)]
pub enum SentencePieceError {
    /// The protobuf stream ended inside a field.
    #[error("truncated model: {0}")]
    Truncated(&'static str),

    /// A varint exceeded 64 bits.
    #[error("varint overflow in model stream")]
    VarintOverflow,

    /// A field used a wire type the parser cannot skip.
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType {
        /// Protobuf field number.
        field: u64,
        /// Protobuf wire type.
        wire_type: u64,
    },

    /// A piece string was not valid UTF-8.
    #[error("piece {0} is not valid UTF-8")]
    InvalidPiece(usize),

    /// The model contained no sentence pieces.
    #[error("model contains no pieces")]
    EmptyModel,

    /// The model file could not be read.
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while constructing a tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The underlying SentencePiece model failed to load.
    #[error("SentencePiece model error: {0}")]
    Model(#[from] SentencePieceError),

    /// `max_len` cannot hold `[CLS] … [SEP]` framing.
    #[error("max_len must be at least 3, got {0}")]
    MaxLenTooSmall(usize),
}
