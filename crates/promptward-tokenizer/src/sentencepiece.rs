//! # SentencePiece Unigram Engine
//!
//! Loads a binary SentencePiece model (a `ModelProto` protobuf) and segments
//! text into subword IDs with Viterbi decoding over the Unigram language
//! model. Only the `pieces` field of the model is consumed; trainer and
//! normalizer specs are skipped by wire type, so any well-formed model
//! parses regardless of which optional fields its exporter emitted.
//!
//! ## Wire Format
//!
//! The parser reads the protobuf encoding directly rather than pulling in a
//! code generator for a three-field message:
//!
//! ```text
//! ModelProto
//!   field 1 (len-delimited, repeated): SentencePiece
//!     field 1 (len-delimited): piece   (UTF-8 string)
//!     field 2 (fixed32):       score   (log probability, f32)
//!     field 3 (varint):        type    (1=NORMAL … 6=BYTE, default NORMAL)
//! ```
//!
//! Piece ID is the index of the piece within the model, matching the
//! convention of every SentencePiece export.
//!
//! ## Special Tokens
//!
//! The five framing tokens (`[PAD]`, `[CLS]`, `[SEP]`, `[UNK]`, `[MASK]`)
//! are **not** stored in the SentencePiece binary; their IDs are supplied at
//! construction via [`SpecialTokens`]. Literal occurrences of those strings
//! in input text survive segmentation as single IDs instead of being split
//! into subwords, which keeps adversarial `[SEP]`-smuggling visible to the
//! classifier as the real token.
//!
//! ## Normalization
//!
//! Mirrors the shipped checkpoint's normalizer settings: runs of whitespace
//! collapse to a single space with outer whitespace dropped
//! (`remove_extra_whitespaces`), a word-boundary marker is prepended
//! (`add_dummy_prefix`), and spaces become `▁` (U+2581). Case is preserved;
//! the vocabulary is cased.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SentencePieceError;

/// Word-boundary marker used by SentencePiece vocabularies.
pub const WORD_BOUNDARY: char = '\u{2581}';

/// Penalty below the lowest piece score assigned to unknown characters.
///
/// Matches the reference implementation's unknown-piece handling: an
/// out-of-vocabulary character is always representable, but at a cost that
/// keeps any in-vocabulary segmentation preferable.
const UNK_PENALTY: f32 = 10.0;

/// IDs of the five framing tokens carried outside the SentencePiece binary.
///
/// The shipped DeBERTa-v3 checkpoint uses [`SpecialTokens::deberta_v3`];
/// other checkpoints supply their own values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Padding filler.
    pub pad: i32,
    /// Sequence start.
    pub cls: i32,
    /// Sequence separator and terminator.
    pub sep: i32,
    /// Unknown piece.
    pub unk: i32,
    /// Masked position (carried for checkpoint parity; never emitted by
    /// classification encodes).
    pub mask: i32,
}

impl SpecialTokens {
    /// Creates a special-token record from explicit IDs.
    pub fn new(pad: i32, cls: i32, sep: i32, unk: i32, mask: i32) -> Self {
        Self {
            pad,
            cls,
            sep,
            unk,
            mask,
        }
    }

    /// Canonical IDs of the DeBERTa-v3-base checkpoint.
    pub fn deberta_v3() -> Self {
        Self {
            pad: 0,
            cls: 1,
            sep: 2,
            unk: 3,
            mask: 128_000,
        }
    }

    /// Literal token strings paired with their IDs.
    ///
    /// Ordered so that scanning for the earliest match is deterministic.
    pub(crate) fn literals(&self) -> [(&'static str, i32); 5] {
        [
            ("[PAD]", self.pad),
            ("[CLS]", self.cls),
            ("[SEP]", self.sep),
            ("[UNK]", self.unk),
            ("[MASK]", self.mask),
        ]
    }
}

/// Kind of a sentence piece, from the model's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Normal,
    Unknown,
    Control,
    UserDefined,
    Unused,
    Byte,
}

impl PieceKind {
    fn from_proto(value: u64) -> Self {
        match value {
            2 => Self::Unknown,
            3 => Self::Control,
            4 => Self::UserDefined,
            5 => Self::Unused,
            6 => Self::Byte,
            _ => Self::Normal,
        }
    }

    /// Whether text segmentation may produce this piece.
    fn matchable(self) -> bool {
        matches!(self, Self::Normal | Self::UserDefined | Self::Byte)
    }
}

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    score: f32,
    kind: PieceKind,
}

/// A loaded SentencePiece Unigram model.
///
/// Shared-immutable after construction: `encode` takes `&self`, performs no
/// I/O, and is safe to call from any number of threads concurrently. The
/// tokenizer layer holds this behind an [`Arc`] so per-call tokenizer
/// rebuilds reuse one vocabulary.
#[derive(Debug)]
pub struct SentencePieceModel {
    pieces: Vec<Piece>,
    /// Piece text to ID for matchable pieces; first occurrence wins.
    index: HashMap<String, i32>,
    specials: SpecialTokens,
    /// Longest matchable piece, in characters. Bounds the Viterbi window.
    max_piece_chars: usize,
    /// Lowest piece score; unknown characters cost `min_score - UNK_PENALTY`.
    min_score: f32,
}

impl SentencePieceModel {
    /// Parses a model from raw protobuf bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SentencePieceError`] if the stream is truncated, a varint
    /// overflows, a piece is not UTF-8, or the model holds no pieces.
    pub fn from_bytes(
        bytes: &[u8],
        specials: SpecialTokens,
    ) -> Result<Self, SentencePieceError> {
        let pieces = parse_model_proto(bytes)?;
        if pieces.is_empty() {
            return Err(SentencePieceError::EmptyModel);
        }

        let mut index = HashMap::with_capacity(pieces.len());
        let mut max_piece_chars = 1;
        let mut min_score = f32::MAX;

        for (id, piece) in pieces.iter().enumerate() {
            min_score = min_score.min(piece.score);
            if piece.kind.matchable() && !piece.text.is_empty() {
                index
                    .entry(piece.text.clone())
                    .or_insert(id as i32);
                max_piece_chars = max_piece_chars.max(piece.text.chars().count());
            }
        }

        Ok(Self {
            pieces,
            index,
            specials,
            max_piece_chars,
            min_score,
        })
    }

    /// Reads and parses a model file.
    pub fn from_file(
        path: impl AsRef<Path>,
        specials: SpecialTokens,
    ) -> Result<Self, SentencePieceError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, specials)
    }

    /// Convenience constructor returning a shareable handle.
    pub fn from_file_shared(
        path: impl AsRef<Path>,
        specials: SpecialTokens,
    ) -> Result<Arc<Self>, SentencePieceError> {
        Ok(Arc::new(Self::from_file(path, specials)?))
    }

    /// Number of pieces in the model.
    pub fn vocab_size(&self) -> usize {
        self.pieces.len()
    }

    /// The special-token IDs this model was constructed with.
    pub fn specials(&self) -> SpecialTokens {
        self.specials
    }

    /// Looks up the ID of an exact piece string, if present and matchable.
    pub fn piece_id(&self, piece: &str) -> Option<i32> {
        self.index.get(piece).copied()
    }

    /// Segments text into piece IDs.
    ///
    /// Adds no BOS/EOS framing. Deterministic for a given input. Literal
    /// special-token substrings (`[CLS]`, `[SEP]`, …) each emit their
    /// configured ID; the surrounding text segments are normalized and
    /// decoded independently.
    pub fn encode(&self, text: &str) -> Vec<i32> {
        let mut ids = Vec::new();
        for segment in self.split_on_specials(text) {
            match segment {
                Segment::Special(id) => ids.push(id),
                Segment::Text(chunk) => {
                    let normalized = normalize(chunk);
                    if !normalized.is_empty() {
                        self.viterbi(&normalized, &mut ids);
                    }
                }
            }
        }
        ids
    }

    /// Lowercases before segmentation.
    ///
    /// Exists for parity testing against lowercased reference token targets
    /// only. Production encoding preserves case; the vocabulary is cased.
    pub fn encode_lowercased(&self, text: &str) -> Vec<i32> {
        self.encode(&text.to_lowercase())
    }

    /// Splits input on literal special-token strings.
    fn split_on_specials<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let literals = self.specials.literals();
        let mut segments = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            // Earliest literal wins; longer literal wins at the same offset
            // so "[MASK]" is never misread through a shorter token.
            let mut hit: Option<(usize, &'static str, i32)> = None;
            for (literal, id) in literals {
                if let Some(at) = rest.find(literal) {
                    let better = match hit {
                        None => true,
                        Some((best_at, best_lit, _)) => {
                            at < best_at || (at == best_at && literal.len() > best_lit.len())
                        }
                    };
                    if better {
                        hit = Some((at, literal, id));
                    }
                }
            }

            match hit {
                Some((at, literal, id)) => {
                    if at > 0 {
                        segments.push(Segment::Text(&rest[..at]));
                    }
                    segments.push(Segment::Special(id));
                    rest = &rest[at + literal.len()..];
                }
                None => {
                    segments.push(Segment::Text(rest));
                    break;
                }
            }
        }

        segments
    }

    /// Viterbi decoding over the Unigram model.
    ///
    /// Finds the segmentation maximizing the sum of piece log probabilities.
    /// Characters covered by no piece take the unknown ID at a fixed penalty,
    /// so decoding is total over any input.
    fn viterbi(&self, normalized: &str, out: &mut Vec<i32>) {
        // Char-boundary byte offsets; positions index between characters.
        let mut starts: Vec<usize> = normalized.char_indices().map(|(i, _)| i).collect();
        starts.push(normalized.len());
        let n = starts.len() - 1;

        let unk_score = self.min_score - UNK_PENALTY;

        // best[i]: score of the best segmentation of the first i chars.
        let mut best = vec![f32::NEG_INFINITY; n + 1];
        best[0] = 0.0;
        // back[i]: (previous position, piece id) of the best edge into i.
        let mut back: Vec<(usize, i32)> = vec![(0, self.specials.unk); n + 1];

        for end in 1..=n {
            let window_start = end.saturating_sub(self.max_piece_chars);
            for start in window_start..end {
                if best[start] == f32::NEG_INFINITY {
                    continue;
                }
                let slice = &normalized[starts[start]..starts[end]];
                if let Some(&id) = self.index.get(slice) {
                    let candidate = best[start] + self.pieces[id as usize].score;
                    if candidate > best[end] {
                        best[end] = candidate;
                        back[end] = (start, id);
                    }
                }
            }

            // Unknown single-character edge keeps the lattice connected.
            let candidate = best[end - 1] + unk_score;
            if candidate > best[end] {
                best[end] = candidate;
                back[end] = (end - 1, self.specials.unk);
            }
        }

        let mut path = Vec::new();
        let mut pos = n;
        while pos > 0 {
            let (prev, id) = back[pos];
            path.push(id);
            pos = prev;
        }
        path.reverse();
        out.extend(path);
    }
}

enum Segment<'t> {
    Text(&'t str),
    Special(i32),
}

/// Collapses whitespace and applies the word-boundary prefix.
fn normalize(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len() + 4);
    for word in text.split_whitespace() {
        collapsed.push(WORD_BOUNDARY);
        collapsed.push_str(word);
    }
    collapsed
}

// ============================================================================
// Protobuf wire parsing
// ============================================================================

struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn varint(&mut self) -> Result<u64, SentencePieceError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(SentencePieceError::Truncated("varint"))?;
            self.pos += 1;
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 64 {
                return Err(SentencePieceError::VarintOverflow);
            }
        }
        Ok(result)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], SentencePieceError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(SentencePieceError::Truncated("length-delimited field"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn len_delimited(&mut self) -> Result<&'a [u8], SentencePieceError> {
        let len = self.varint()? as usize;
        self.bytes(len)
    }

    fn fixed32(&mut self) -> Result<[u8; 4], SentencePieceError> {
        let slice = self.bytes(4)?;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn skip(&mut self, field: u64, wire_type: u64) -> Result<(), SentencePieceError> {
        match wire_type {
            0 => {
                self.varint()?;
            }
            1 => {
                self.bytes(8)?;
            }
            2 => {
                self.len_delimited()?;
            }
            5 => {
                self.bytes(4)?;
            }
            _ => return Err(SentencePieceError::UnsupportedWireType { field, wire_type }),
        }
        Ok(())
    }
}

/// Extracts the `pieces` list from a `ModelProto` stream.
fn parse_model_proto(bytes: &[u8]) -> Result<Vec<Piece>, SentencePieceError> {
    let mut reader = WireReader::new(bytes);
    let mut pieces = Vec::new();

    while reader.remaining() {
        let key = reader.varint()?;
        let field = key >> 3;
        let wire_type = key & 0x7;

        if field == 1 && wire_type == 2 {
            let body = reader.len_delimited()?;
            pieces.push(parse_piece(body, pieces.len())?);
        } else {
            reader.skip(field, wire_type)?;
        }
    }

    Ok(pieces)
}

/// Parses one `SentencePiece` submessage.
fn parse_piece(bytes: &[u8], ordinal: usize) -> Result<Piece, SentencePieceError> {
    let mut reader = WireReader::new(bytes);
    let mut text = String::new();
    let mut score = 0.0f32;
    let mut kind = PieceKind::Normal;

    while reader.remaining() {
        let key = reader.varint()?;
        let field = key >> 3;
        let wire_type = key & 0x7;

        match (field, wire_type) {
            (1, 2) => {
                let raw = reader.len_delimited()?;
                text = std::str::from_utf8(raw)
                    .map_err(|_| SentencePieceError::InvalidPiece(ordinal))?
                    .to_string();
            }
            (2, 5) => {
                score = f32::from_le_bytes(reader.fixed32()?);
            }
            (3, 0) => {
                kind = PieceKind::from_proto(reader.varint()?);
            }
            _ => reader.skip(field, wire_type)?,
        }
    }

    Ok(Piece { text, score, kind })
}
