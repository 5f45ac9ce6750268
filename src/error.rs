//! Error types for josedb
//!
//! This module defines all error types used throughout the database engine.

use thiserror::Error;

/// The main error type for josedb
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Parse error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Parse error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Parse error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Name Resolution Errors ==========
    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("Column '{0}' not found in table '{1}'")]
    UnknownColumn(String, String),

    #[error("Column '{0}' is ambiguous between the joined tables")]
    AmbiguousColumn(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Duplicate column '{0}' in table '{1}'")]
    DuplicateColumn(String, String),

    // ========== Constraint Errors ==========
    #[error("Column count mismatch: expected {expected}, got {found}")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("Unique constraint violated on column '{0}'")]
    UniqueViolation(String),

    // ========== Persistence Errors ==========
    #[error("Corrupt database file: {0}")]
    CorruptDatabase(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for josedb operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownTable("users".to_string());
        assert_eq!(err.to_string(), "Table 'users' not found");

        let err = Error::UniqueViolation("id".to_string());
        assert_eq!(err.to_string(), "Unique constraint violated on column 'id'");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Parse error: unexpected character '@' at position 5"
        );
    }
}
