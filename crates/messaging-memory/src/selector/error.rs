use thiserror::Error;

/// Errors parsing a selector expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A character that cannot start any token.
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    /// A string literal without its closing quote.
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    /// A numeric literal that does not fit.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// The parser expected something else.
    #[error("expected {expected} but found {found}")]
    Unexpected {
        /// What the grammar allows here.
        expected: &'static str,
        /// What was actually there.
        found: String,
    },

    /// `ESCAPE` must be followed by a single character.
    #[error("escape clause must be a single character, got '{0}'")]
    InvalidEscape(String),
}
