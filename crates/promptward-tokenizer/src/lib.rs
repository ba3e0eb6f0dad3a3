//! # Promptward Tokenizer - DeBERTa-v3 Preprocessing
//!
//! Faithful reimplementation of the Hugging Face DeBERTa-v2/v3 preprocessing
//! pipeline. The downstream injection classifier was trained against exact
//! token IDs, so this crate reproduces the reference encoding byte for byte:
//! SentencePiece Unigram segmentation, manual special-token framing, pair
//! truncation, right padding, and attention-mask construction.
//!
//! ## Architecture
//!
//! ```text
//!   raw text
//!      │
//!      ▼
//! ┌────────────────────┐     ┌─────────────────────────────┐
//! │  SentencePiece     │     │  DebertaTokenizer           │
//! │  Unigram engine    │────▶│                             │
//! │                    │     │  [CLS] framing  [SEP]       │
//! │  • protobuf loader │     │  pair truncation            │
//! │  • Viterbi segment │     │  [PAD] padding              │
//! │  • special-token   │     │  attention mask             │
//! │    survival        │     │                             │
//! └────────────────────┘     └─────────────┬───────────────┘
//!                                          ▼
//!                               Encoding { input_ids,
//!                                          attention_mask }
//! ```
//!
//! ## Division of Labor
//!
//! | Layer | Owns |
//! |-------|------|
//! | [`SentencePieceModel`] | Vocabulary, normalization, subword segmentation |
//! | [`DebertaTokenizer`] | Framing, truncation strategy, padding, masks |
//!
//! The SentencePiece model adds no BOS/EOS of its own; all framing belongs
//! to the tokenizer layer, mirroring the reference checkpoint where the five
//! special-token IDs live outside the SentencePiece binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use promptward_tokenizer::{DebertaTokenizer, SpecialTokens, TruncationStrategy};
//!
//! let tokenizer = DebertaTokenizer::from_file(
//!     "spm.model",
//!     SpecialTokens::deberta_v3(),
//!     512,
//!     TruncationStrategy::LongestFirst,
//! )?;
//!
//! let encoding = tokenizer.encode("Hello, how are you?");
//! assert_eq!(encoding.input_ids.len(), 512);
//! assert_eq!(encoding.input_ids[0], SpecialTokens::deberta_v3().cls);
//! ```

mod error;
pub mod checkpoint;
pub mod deberta;
pub mod sentencepiece;

pub use deberta::{DebertaTokenizer, Encoding, TruncationStrategy};
pub use error::{SentencePieceError, TokenizerError};
pub use sentencepiece::{SentencePieceModel, SpecialTokens};

/// Result type for tokenizer operations.
pub type Result<T> = std::result::Result<T, TokenizerError>;
