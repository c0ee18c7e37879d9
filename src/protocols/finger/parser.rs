//! Finger request parsing and identifier validation.

use std::fmt;
use thiserror::Error;

/// Most bytes read from a client for one request.
pub const MAX_REQUEST_LEN: usize = 33;

/// Longest identifier accepted, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 32;

/// Characters with meaning to a shell, never valid in an identifier.
pub const ILLEGAL_CHARS: &[char] = &['|', ';', '/', '&', '$', '`', '?', '=', '+', '(', ')', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identifier must be 1 to 32 bytes")]
    LengthOutOfRange,
    #[error("whitespace in identifier")]
    WhitespaceFound,
    #[error("illegal character in identifier")]
    IllegalCharacter,
    #[error("more than one '@' in identifier")]
    MultipleAtSigns,
}

/// A login name that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn the raw bytes of one read into a candidate identifier.
///
/// Surrounding whitespace (including the `\r\n` terminator) is trimmed.
/// Invalid UTF-8 is replaced rather than rejected here; validation and
/// lookup decide what to do with it.
pub fn parse_request(input: &[u8]) -> String {
    let input = &input[..input.len().min(MAX_REQUEST_LEN)];
    String::from_utf8_lossy(input).trim().to_string()
}

/// Check an identifier against the injection rules, in order.
pub fn validate(raw: &str) -> Result<Identifier, ValidationError> {
    if raw.is_empty() || raw.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::LengthOutOfRange);
    }

    if raw.chars().any(char::is_whitespace) {
        return Err(ValidationError::WhitespaceFound);
    }

    if raw.contains(ILLEGAL_CHARS) {
        return Err(ValidationError::IllegalCharacter);
    }

    if raw.matches('@').count() > 1 {
        return Err(ValidationError::MultipleAtSigns);
    }

    Ok(Identifier(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_trims_line_ending() {
        assert_eq!(parse_request(b"alice\r\n"), "alice");
        assert_eq!(parse_request(b"  alice \n"), "alice");
        assert_eq!(parse_request(b"\r\n"), "");
    }

    #[test]
    fn test_parse_request_caps_length() {
        let input = [b'a'; 64];
        assert_eq!(parse_request(&input).len(), MAX_REQUEST_LEN);
    }

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(validate("alice").unwrap().as_str(), "alice");
        assert!(validate("alice@host").is_ok());
        assert!(validate("a").is_ok());
        assert!(validate(&"x".repeat(MAX_IDENTIFIER_LEN)).is_ok());
        assert!(validate("first.last-name_1").is_ok());
    }

    #[test]
    fn test_length_out_of_range() {
        assert_eq!(validate(""), Err(ValidationError::LengthOutOfRange));
        assert_eq!(
            validate(&"x".repeat(MAX_IDENTIFIER_LEN + 1)),
            Err(ValidationError::LengthOutOfRange)
        );
        // Length is measured in bytes, not characters.
        assert_eq!(
            validate(&"é".repeat(17)),
            Err(ValidationError::LengthOutOfRange)
        );
    }

    #[test]
    fn test_whitespace_rejected() {
        for raw in ["al ice", " alice", "alice\t", "a\nb"] {
            assert_eq!(validate(raw), Err(ValidationError::WhitespaceFound), "{raw:?}");
        }
    }

    #[test]
    fn test_each_illegal_character_rejected() {
        for c in ILLEGAL_CHARS {
            let raw = format!("al{c}ice");
            assert_eq!(validate(&raw), Err(ValidationError::IllegalCharacter), "{raw}");
        }
    }

    #[test]
    fn test_at_signs() {
        assert!(validate("alice@example").is_ok());
        assert_eq!(validate("a@b@c"), Err(ValidationError::MultipleAtSigns));
        assert_eq!(validate("@@"), Err(ValidationError::MultipleAtSigns));
    }

    #[test]
    fn test_rule_order() {
        // Length is checked before content.
        assert_eq!(
            validate(&format!("{}|", "x".repeat(40))),
            Err(ValidationError::LengthOutOfRange)
        );
        // Whitespace before illegal characters.
        assert_eq!(validate("a |b"), Err(ValidationError::WhitespaceFound));
        // Illegal characters before '@' counting.
        assert_eq!(validate("a@b@c;"), Err(ValidationError::IllegalCharacter));
    }
}
