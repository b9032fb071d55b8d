//! Errors for query execution.

/// Errors that can occur while running a plan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Query(QueryError),
    #[error("database error: {0}")]
    DB(#[from] sqlx::Error),
}

/// The database answered, but not in the shape the plan expects.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("the record column does not hold json: {0}")]
    MalformedRecord(#[from] serde_json::Error),
    #[error("the count {0} is out of range")]
    InvalidCount(i64),
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error::Query(value)
    }
}
