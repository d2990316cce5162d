//! String literal handling.
//!
//! A Kconfig string is enclosed by double (`"`) or single (`'`) quotes. A backslash escapes the following
//! character, whatever it is; there are no C-style escape sequences. `.config` files use the same convention
//! for string values, restricted to double quotes.

use crate::parser::{Expected, KConfigError, PeekableChars};

/// Parse a string literal from the stream.
///
/// The stream must be pointing at the opening quote character `quote`. The literal must be closed on the same
/// (logical) line.
pub fn parse_string_literal(chars: &mut PeekableChars, quote: char) -> Result<String, KConfigError> {
    let start = chars.location();

    match chars.next() {
        Some(c) if c == quote => (),
        Some(c) => return Err(KConfigError::unexpected(c, quote, start)),
        None => return Err(KConfigError::unexpected_eof(Expected::StringLiteral, start)),
    }

    let mut result = String::new();

    loop {
        let Some(c) = chars.next() else {
            return Err(KConfigError::unexpected_eof(quote, chars.location()));
        };

        if c == quote {
            break;
        }

        if c == '\\' {
            let Some(escaped) = chars.next() else {
                return Err(KConfigError::unexpected_eof(Expected::Any, chars.location()));
            };
            result.push(escaped);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Escape a string value for a `.config` line.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' || c == '\\' {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Decode a quoted string value from a `.config` line. Returns `None` if the value is not a well-formed,
/// double-quoted string.
pub fn unescape_config_string(value: &str) -> Option<String> {
    let interior = value.strip_prefix('"')?;
    let mut result = String::with_capacity(interior.len());
    let mut chars = interior.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                return if chars.as_str().is_empty() {
                    Some(result)
                } else {
                    None
                };
            }
            '\\' => result.push(chars.next()?),
            c => result.push(c),
        }
    }

    None
}
