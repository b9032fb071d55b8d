//! Errors for translation.

use query_engine_metadata::metadata::database::ScalarType;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("grid '{0}' is not configured")]
    GridNotFound(String),
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
    #[error("relation '{0}' not found")]
    RelationNotFound(String),
    #[error("column '{0}' not found in relation '{1}'")]
    ColumnNotFound(String, String),
    #[error("value {0} does not fit a column of type {1}")]
    TypeMismatch(serde_json::Value, ScalarType),
    #[error("column '{0}' does not accept null")]
    UnexpectedNull(String),
    #[error("invalid value for '{0}': {1}")]
    InvalidField(String, Box<Error>),
    #[error("{0} are not supported")]
    NotSupported(String),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}
