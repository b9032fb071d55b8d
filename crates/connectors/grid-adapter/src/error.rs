//! Errors reported to grids.
//!
//! Every variant renders the message a grid receives in an error envelope.
//! Database details stay in the logs.

use grid_models::Command;
use query_engine_execution::error as execution;
use query_engine_translation::translation::error as translation;

/// A failed grid command.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("expected a '{expected}' request, received '{received}'")]
    CommandMismatch { expected: Command, received: Command },
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid grid request: {0}")]
    InvalidRequest(String),
    #[error("grid '{0}' is not configured")]
    GridNotConfigured(String),
    #[error("invalid value for '{field}' on record {recid}")]
    InvalidValue {
        field: String,
        recid: String,
        #[source]
        source: translation::Error,
    },
    #[error("unable to fetch records")]
    Fetch(#[source] execution::Error),
    #[error("unable to save record {0}")]
    Save(String, #[source] execution::Error),
    #[error("unable to delete record {0}")]
    Delete(String, #[source] execution::Error),
    #[error("unable to translate the request for grid '{grid}'")]
    Translation {
        grid: String,
        #[source]
        source: translation::Error,
    },
}

impl GridError {
    /// Wrap a translation error raised while serving a grid.
    pub fn translation(grid: &str, error: translation::Error) -> Self {
        match error {
            translation::Error::GridNotFound(name) => GridError::GridNotConfigured(name),
            source => GridError::Translation {
                grid: grid.to_string(),
                source,
            },
        }
    }
}

/// The identifier of a record as it appears in messages: strings unquoted.
pub fn display_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(id) => id.clone(),
        id => id.to_string(),
    }
}
