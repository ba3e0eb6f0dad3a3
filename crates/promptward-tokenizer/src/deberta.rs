//! # DeBERTa Tokenizer - Framing, Truncation, Padding
//!
//! Wraps the SentencePiece engine with everything the classifier's input
//! contract requires: `[CLS]`/`[SEP]` framing, pair assembly, a truncation
//! strategy, right padding with `[PAD]`, and attention-mask construction.
//!
//! ## Encoding Shapes
//!
//! | Input | Layout |
//! |-------|--------|
//! | single | `[CLS] A… [SEP] [PAD]…` |
//! | pair | `[CLS] A… [SEP] B… [SEP] [PAD]…` |
//!
//! Every encoding is exactly `max_len` positions long; the attention mask
//! is `1` over the real prefix (specials included) and `0` over padding.
//!
//! ## Truncation
//!
//! Single sequences head-truncate content to `max_len - 2`. Pairs reserve
//! three special slots and share a `max_len - 3` content budget between the
//! two sides according to the configured [`TruncationStrategy`]. Both
//! strategies drop tokens from the back of a side, never the front.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TokenizerError;
use crate::sentencepiece::{SentencePieceModel, SpecialTokens};

/// Default sequence length, matching the checkpoint's position budget.
pub const DEFAULT_MAX_LEN: usize = 512;

/// How a pair encoding spends its shared content budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruncationStrategy {
    /// Drop the last token of whichever side is currently longer; ties drop
    /// from the first side. Reference-compatible default.
    #[default]
    LongestFirst,
    /// Drop from the first side until it is exhausted, then fall back to
    /// the second side so the budget is always met.
    OnlyFirst,
}

/// A fixed-length encoded sequence ready for the classifier.
///
/// Immutable once produced. `input_ids` and `attention_mask` always have
/// identical length equal to the tokenizer's `max_len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    /// Token IDs, `[CLS]`-framed and `[PAD]`-filled.
    pub input_ids: Vec<i32>,
    /// `1` for real positions (specials included), `0` for padding.
    pub attention_mask: Vec<i32>,
}

impl Encoding {
    /// Total sequence length including padding.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// True when the encoding holds no positions at all.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of real (non-padding) positions.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Tokenizer reproducing the reference DeBERTa-v2/v3 preprocessing.
///
/// Construction is cheap once the SentencePiece model is loaded; the model
/// is held behind an [`Arc`] so variants with a different `max_len` share
/// one vocabulary. All methods take `&self` and the type is `Send + Sync`,
/// so a single instance may serve concurrent scanners.
#[derive(Clone)]
pub struct DebertaTokenizer {
    sp: Arc<SentencePieceModel>,
    specials: SpecialTokens,
    max_len: usize,
    truncation: TruncationStrategy,
}

impl DebertaTokenizer {
    /// Wraps an already loaded SentencePiece model.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::MaxLenTooSmall`] when `max_len < 3`; a pair
    /// encoding needs room for its three special tokens.
    pub fn new(
        sp: Arc<SentencePieceModel>,
        specials: SpecialTokens,
        max_len: usize,
        truncation: TruncationStrategy,
    ) -> Result<Self, TokenizerError> {
        if max_len < 3 {
            return Err(TokenizerError::MaxLenTooSmall(max_len));
        }
        Ok(Self {
            sp,
            specials,
            max_len,
            truncation,
        })
    }

    /// Loads the SentencePiece model from disk and wraps it.
    pub fn from_file(
        path: impl AsRef<Path>,
        specials: SpecialTokens,
        max_len: usize,
        truncation: TruncationStrategy,
    ) -> Result<Self, TokenizerError> {
        let sp = Arc::new(SentencePieceModel::from_file(path, specials)?);
        Self::new(sp, specials, max_len, truncation)
    }

    /// Parses the SentencePiece model from bytes and wraps it.
    pub fn from_bytes(
        bytes: &[u8],
        specials: SpecialTokens,
        max_len: usize,
        truncation: TruncationStrategy,
    ) -> Result<Self, TokenizerError> {
        let sp = Arc::new(SentencePieceModel::from_bytes(bytes, specials)?);
        Self::new(sp, specials, max_len, truncation)
    }

    /// A tokenizer with a different sequence length sharing this vocabulary.
    pub fn with_max_len(&self, max_len: usize) -> Result<Self, TokenizerError> {
        Self::new(Arc::clone(&self.sp), self.specials, max_len, self.truncation)
    }

    /// The configured sequence length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The special-token IDs in use.
    pub fn specials(&self) -> SpecialTokens {
        self.specials
    }

    /// The shared SentencePiece handle.
    pub fn sentencepiece(&self) -> &Arc<SentencePieceModel> {
        &self.sp
    }

    /// Encodes a single sequence as `[CLS] text [SEP]` plus padding.
    ///
    /// Never fails on valid UTF-8 input; over-long content head-truncates
    /// to fit. An empty input encodes as `[CLS] [SEP] [PAD]…`.
    pub fn encode(&self, text: &str) -> Encoding {
        let mut content = self.sp.encode(text);
        content.truncate(self.max_len - 2);

        let mut ids = Vec::with_capacity(self.max_len);
        ids.push(self.specials.cls);
        ids.extend_from_slice(&content);
        ids.push(self.specials.sep);

        self.finish(ids)
    }

    /// Encodes a pair as `[CLS] a [SEP] b [SEP]` plus padding.
    ///
    /// The two sides are segmented independently and share a
    /// `max_len - 3` content budget under the configured
    /// [`TruncationStrategy`]. An empty pair encodes as
    /// `[CLS] [SEP] [SEP] [PAD]…`.
    pub fn encode_pair(&self, text_a: &str, text_b: &str) -> Encoding {
        let mut a = self.sp.encode(text_a);
        let mut b = self.sp.encode(text_b);

        let budget = self.max_len - 3;
        match self.truncation {
            TruncationStrategy::LongestFirst => {
                while a.len() + b.len() > budget {
                    if a.len() >= b.len() {
                        a.pop();
                    } else {
                        b.pop();
                    }
                }
            }
            TruncationStrategy::OnlyFirst => {
                while a.len() + b.len() > budget && !a.is_empty() {
                    a.pop();
                }
                // Safety fallback: the first side alone may not be enough.
                while a.len() + b.len() > budget {
                    b.pop();
                }
            }
        }

        let mut ids = Vec::with_capacity(self.max_len);
        ids.push(self.specials.cls);
        ids.extend_from_slice(&a);
        ids.push(self.specials.sep);
        ids.extend_from_slice(&b);
        ids.push(self.specials.sep);

        self.finish(ids)
    }

    /// Pads to `max_len` and derives the attention mask.
    fn finish(&self, mut ids: Vec<i32>) -> Encoding {
        debug_assert!(ids.len() <= self.max_len);
        let real_len = ids.len();
        ids.resize(self.max_len, self.specials.pad);

        let mut mask = vec![0i32; self.max_len];
        for m in mask.iter_mut().take(real_len) {
            *m = 1;
        }

        Encoding {
            input_ids: ids,
            attention_mask: mask,
        }
    }
}
