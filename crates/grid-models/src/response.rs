use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The envelope every grid command answers with.
///
/// `total` and `records` are only present on a successful read; `message`
/// is only present on an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GridResponse {
    pub fn success() -> Self {
        GridResponse {
            status: Status::Success,
            total: None,
            records: None,
            message: None,
        }
    }

    pub fn records(total: u64, records: Vec<Value>) -> Self {
        GridResponse {
            status: Status::Success,
            total: Some(total),
            records: Some(records),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        GridResponse {
            status: Status::Error,
            total: None,
            records: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// The SQL a read request would run, without running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainResponse {
    pub count_sql: String,
    pub rows_sql: String,
    /// Bound to `$1`, `$2`, ... in both statements.
    pub params: Vec<Value>,
}
