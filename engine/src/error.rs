//! Error types for the ranked engine.

use crate::{Rank, RecordId, TableName};
use thiserror::Error;

/// All possible errors from the ranked engine and its in-memory store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Binding errors
    #[error("no scope called \"{0}\" found in table")]
    InvalidScope(String),

    #[error("no field called \"{0}\" found in table")]
    InvalidField(String),

    // Configuration errors
    #[error("invalid rank bounds: min {min} must be below max {max}")]
    InvalidBounds { min: Rank, max: Rank },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Ranking errors
    #[error("group of {members} records does not fit in {capacity} ranks")]
    GroupFull { members: usize, capacity: usize },

    // Store errors
    #[error("table not found: {0}")]
    TableNotFound(TableName),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(RecordId),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidScope("active".into());
        assert_eq!(err.to_string(), "no scope called \"active\" found in table");

        let err = Error::InvalidField("pond".into());
        assert_eq!(err.to_string(), "no field called \"pond\" found in table");

        let err = Error::InvalidBounds { min: 10, max: 10 };
        assert_eq!(
            err.to_string(),
            "invalid rank bounds: min 10 must be below max 10"
        );

        let err = Error::TypeMismatch {
            field: "row_order".into(),
            expected: "Int".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'row_order': expected Int, got String"
        );
    }
}
