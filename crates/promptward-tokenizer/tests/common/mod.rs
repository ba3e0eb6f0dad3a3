//! Shared fixtures: a hand-serialized Unigram model and a deterministic
//! pseudo-random generator for property sweeps.

/// Appends a protobuf varint.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Serializes a minimal SentencePiece `ModelProto` from `(piece, score)`
/// pairs; piece ID equals list position.
pub fn build_model(pieces: &[(&str, f32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (text, score) in pieces {
        let mut body = Vec::new();
        body.push(0x0A); // piece, len-delimited
        put_varint(&mut body, text.len() as u64);
        body.extend_from_slice(text.as_bytes());
        body.push(0x15); // score, fixed32
        body.extend_from_slice(&score.to_le_bytes());

        buf.push(0x0A); // ModelProto.pieces
        put_varint(&mut buf, body.len() as u64);
        buf.extend_from_slice(&body);
    }
    buf
}

/// A model covering lowercase ASCII words plus single-character fallbacks,
/// wide enough for the invariant sweeps.
pub fn ascii_model() -> Vec<u8> {
    let words = [
        "\u{2581}hello", "\u{2581}world", "\u{2581}how", "\u{2581}are",
        "\u{2581}you", "\u{2581}the", "\u{2581}and", "\u{2581}ignore",
    ];
    let mut pieces: Vec<(String, f32)> =
        words.iter().map(|w| (w.to_string(), -2.0)).collect();
    pieces.push(("\u{2581}".to_string(), -5.0));
    for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
        pieces.push((c.to_string(), -8.0));
    }
    for c in ['!', '?', '.', ',', ':', ';'] {
        pieces.push((c.to_string(), -6.0));
    }
    let borrowed: Vec<(&str, f32)> =
        pieces.iter().map(|(s, f)| (s.as_str(), *f)).collect();
    build_model(&borrowed)
}

/// Xorshift generator; deterministic so failures reproduce.
pub struct XorShift(pub u64);

impl XorShift {
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Printable-ASCII string of the given length.
    pub fn ascii_string(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| {
                let c = 0x20 + (self.next_u64() % 0x5F) as u8;
                c as char
            })
            .collect()
    }
}
