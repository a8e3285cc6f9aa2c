//! Splits encoded text into chunks that fit the channel ceiling.

use crate::escape::{is_safe_char, quote};
use crate::types::Chunk;

/// Size budget for a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget {
    /// Maximum length of the chunk's escaped form.
    pub max_escaped: usize,
    /// Optional cap on payload characters per chunk.
    pub max_payload: Option<usize>,
}

/// Error returned when not even a one-character chunk fits the budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chunk budget of {budget} bytes cannot hold an escaped chunk of {required} bytes")]
pub struct ChunkOverflow {
    pub budget: usize,
    pub required: usize,
}

/// Running quoted length of a slice as characters are appended.
///
/// Mirrors [`crate::escape::quoted_len`] incrementally: a slice stays bare
/// while every character is safe and switches to `'...'` form on the first
/// character that is not.
struct QuotedLen {
    raw: usize,
    body: usize,
    all_safe: bool,
    empty: bool,
}

impl QuotedLen {
    fn new() -> Self {
        Self {
            raw: 0,
            body: 0,
            all_safe: true,
            empty: true,
        }
    }

    fn with(&self, ch: char) -> Self {
        Self {
            raw: self.raw + ch.len_utf8(),
            body: self.body + if ch == '\'' { 4 } else { ch.len_utf8() },
            all_safe: self.all_safe && is_safe_char(ch),
            empty: false,
        }
    }

    fn len(&self) -> usize {
        if self.all_safe && !self.empty {
            self.raw
        } else {
            self.body + 2
        }
    }
}

/// Splits `encoded` into the fewest in-order chunks that fit `budget`.
///
/// Empty input yields no chunks. Chunks are filled greedily, so every chunk
/// except possibly the last is as large as the budget allows.
pub fn split(encoded: &str, budget: ChunkBudget) -> Result<Vec<Chunk>, ChunkOverflow> {
    let max_payload = budget.max_payload.unwrap_or(usize::MAX);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars = 0usize;
    let mut acc = QuotedLen::new();

    for (pos, ch) in encoded.char_indices() {
        let next = acc.with(ch);
        if chars < max_payload && next.len() <= budget.max_escaped {
            acc = next;
            chars += 1;
            continue;
        }

        if chars == 0 {
            return Err(ChunkOverflow {
                budget: budget.max_escaped,
                required: next.len(),
            });
        }

        chunks.push(make_chunk(chunks.len(), &encoded[start..pos]));
        start = pos;
        acc = QuotedLen::new().with(ch);
        chars = 1;
        if acc.len() > budget.max_escaped {
            return Err(ChunkOverflow {
                budget: budget.max_escaped,
                required: acc.len(),
            });
        }
    }

    if start < encoded.len() {
        chunks.push(make_chunk(chunks.len(), &encoded[start..]));
    }

    Ok(chunks)
}

fn make_chunk(sequence: usize, payload: &str) -> Chunk {
    Chunk {
        sequence,
        payload: payload.to_string(),
        escaped: quote(payload).into_owned(),
    }
}
