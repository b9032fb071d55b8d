//! Common functions used across test cases.

use serde_json::Value;
use sqlx::SqlitePool;

use grid_models::{GridRequest, GridResponse};

/// Build a request from its wire form.
pub fn request(body: Value) -> GridRequest {
    serde_json::from_value(body).unwrap()
}

/// The `recid` of every record of a read response, in order.
pub fn recids(response: &GridResponse) -> Vec<i64> {
    response
        .records
        .as_ref()
        .unwrap()
        .iter()
        .map(|record| record["recid"].as_i64().unwrap())
        .collect()
}

/// A column of one user, straight from the database.
pub async fn user_column(pool: &SqlitePool, id: i64, column: &str) -> Value {
    let (value,): (String,) = sqlx::query_as(&format!(
        "SELECT json_quote(\"{column}\") FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap();
    serde_json::from_str(&value).unwrap()
}

pub async fn user_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap()
}
