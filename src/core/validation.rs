//! Input validation for anything that ends up in an argument vector.
//!
//! Targets are checked against an allow-set (letters, digits, `.`, `-`, `:`,
//! `/`). Secondary arguments are checked against a deny-set of shell
//! metacharacters, because they need a wider syntax (port ranges, flag
//! values). Both functions are pure and may be called from any entry point.

use thiserror::Error;

/// Characters never accepted in a free-form argument
pub const DENIED_CHARACTERS: [char; 13] = [
    '&', '|', ';', '$', '`', '\n', '(', ')', '<', '>', '"', '\'', '\\',
];

/// Validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid target format: {0}")]
    InvalidFormat(String),

    #[error("Invalid character in input: {0:?}")]
    InvalidCharacter(char),
}

impl ValidationError {
    /// Short name of the failure, safe to log without the offending value
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidCharacter(_) => "invalid_character",
        }
    }
}

fn is_target_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '/')
}

/// Accept a target only if it is non-empty and every character is in the allow-set
pub fn validate_target(raw: &str) -> Result<&str, ValidationError> {
    if raw.is_empty() || !raw.chars().all(is_target_char) {
        return Err(ValidationError::InvalidFormat(raw.to_string()));
    }
    Ok(raw)
}

/// Accept an argument only if it contains none of the denied characters
pub fn validate_argument(raw: &str) -> Result<&str, ValidationError> {
    match raw.chars().find(|c| DENIED_CHARACTERS.contains(c)) {
        Some(c) => Err(ValidationError::InvalidCharacter(c)),
        None => Ok(raw),
    }
}

/// Validate a list of arguments, stopping at the first failure
pub fn validate_arguments<S: AsRef<str>>(args: &[S]) -> Result<(), ValidationError> {
    for arg in args {
        validate_argument(arg.as_ref())?;
    }
    Ok(())
}
