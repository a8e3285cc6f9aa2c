//! POSIX shell quoting for command arguments.
//!
//! Every value interpolated into a remote command goes through [`quote`].
//! Words made only of [`is_safe_char`] characters pass through bare; anything
//! else is wrapped in single quotes, inside which the shell treats every byte
//! literally (backslashes, newlines, `$`, backticks and control characters
//! included). An embedded single quote closes the quoted run, emits `\'`, and
//! reopens it.
//!
//! NUL cannot appear in an `exec` argument and is never produced by the encoder.

use std::borrow::Cow;

/// Cost of one embedded `'` once quoted: `'\''`.
const QUOTE_ESCAPE: &str = "'\\''";

/// Error returned by [`unquote`] for input that is not a single shell word.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnquoteError {
    #[error("unterminated single quote")]
    UnterminatedQuote,

    #[error("dangling backslash")]
    DanglingBackslash,

    #[error("unquoted special character {0:?} at byte {1}")]
    Unquoted(char, usize),
}

/// Characters that never need quoting.
pub fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '/' | '.' | ':' | '=' | '+' | ',' | '@' | '%')
}

/// Quotes `s` as a single shell word.
pub fn quote(s: &str) -> Cow<'_, str> {
    if !s.is_empty() && s.chars().all(is_safe_char) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(quoted_len(s));
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str(QUOTE_ESCAPE);
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    Cow::Owned(out)
}

/// Byte length of `quote(s)` without allocating.
pub fn quoted_len(s: &str) -> usize {
    if !s.is_empty() && s.chars().all(is_safe_char) {
        return s.len();
    }
    2 + quoted_body_len(s)
}

/// Byte length `s` occupies inside a single-quoted run.
pub fn quoted_body_len(s: &str) -> usize {
    s.chars()
        .map(|ch| {
            if ch == '\'' {
                QUOTE_ESCAPE.len()
            } else {
                ch.len_utf8()
            }
        })
        .sum()
}

/// Parses one shell word back into its literal value.
///
/// Accepts bare safe characters, single-quoted runs and backslash escapes
/// outside quotes, which is every form [`quote`] emits.
pub fn unquote(word: &str) -> Result<String, UnquoteError> {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.char_indices();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\'' => loop {
                match chars.next() {
                    Some((_, '\'')) => break,
                    Some((_, c)) => out.push(c),
                    None => return Err(UnquoteError::UnterminatedQuote),
                }
            },
            '\\' => match chars.next() {
                Some((_, c)) => out.push(c),
                None => return Err(UnquoteError::DanglingBackslash),
            },
            c if is_safe_char(c) => out.push(c),
            c => return Err(UnquoteError::Unquoted(c, pos)),
        }
    }

    Ok(out)
}
