//! Constants of the shipped DeBERTa-v3-base injection checkpoint.
//!
//! Kept here so configuration assertions have one source of truth; the
//! runtime never requires them (special IDs always arrive via
//! [`SpecialTokens`](crate::SpecialTokens)).

/// Vocabulary size of the shipped checkpoint (128,000 pieces plus the
/// reserved tail holding `[MASK]` and unused slots).
pub const VOCAB_SIZE: usize = 128_100;

/// Position budget of the encoder (`max_position_embeddings`).
pub const MAX_POSITION_EMBEDDINGS: usize = 512;

/// Padding token ID recorded in the checkpoint config.
pub const PAD_TOKEN_ID: i32 = 0;
