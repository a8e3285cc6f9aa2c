//! Byte → shell-safe text encoding.
//!
//! Payloads travel as standard padded base64. The alphabet (`A-Z a-z 0-9 + / =`)
//! never needs quoting in a POSIX shell word, and the remote side decodes it
//! with the stock `base64 -d` utility.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Error returned when staged text is not valid base64.
#[derive(Debug, thiserror::Error)]
#[error("invalid encoded payload: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Encodes `data` for transport.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes text produced by [`encode`].
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(text)?)
}

/// Exact encoded length for `len` input bytes: `4 * ceil(len / 3)`.
pub const fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Returns `true` if `c` belongs to the encoder's output alphabet.
pub fn is_alphabet_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}
