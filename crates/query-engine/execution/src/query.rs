//! Execute read plans against the database.

use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{Row, SqliteConnection};
use tracing::{info_span, Instrument};

use query_engine_sql::sql;
use query_engine_sql::sql::string::Param;

use crate::error::{Error, QueryError};

/// Count the records a read plan restricts to, ignoring its page.
pub async fn count(
    connection: &mut SqliteConnection,
    plan: &sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>,
) -> Result<u64, Error> {
    let query = plan.query.count_sql();
    tracing::debug!(grid = %plan.grid, sql = %query.sql, params = ?query.params, "Counting records");

    let row = build_query_with_params(&query)
        .fetch_one(&mut *connection)
        .instrument(info_span!("Count records", grid = %plan.grid))
        .await?;

    let total: i64 = row.try_get(sql::helpers::TOTAL_COLUMN)?;
    u64::try_from(total).map_err(|_| QueryError::InvalidCount(total).into())
}

/// Fetch the page of records of a read plan, one json object per row.
pub async fn fetch_rows(
    connection: &mut SqliteConnection,
    plan: &sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>,
) -> Result<Vec<serde_json::Value>, Error> {
    let query = plan.query.rows_sql();
    tracing::debug!(grid = %plan.grid, sql = %query.sql, params = ?query.params, "Fetching records");

    let rows = build_query_with_params(&query)
        .fetch_all(&mut *connection)
        .instrument(info_span!("Fetch records", grid = %plan.grid))
        .await?;

    rows.iter().map(decode_record).collect()
}

/// Fetch the one record a lookup plan addresses, if it exists.
pub async fn lookup(
    connection: &mut SqliteConnection,
    plan: &sql::execution_plan::ExecutionPlan<sql::execution_plan::Lookup>,
) -> Result<Option<serde_json::Value>, Error> {
    let query = plan.query.query_sql();
    tracing::debug!(grid = %plan.grid, sql = %query.sql, params = ?query.params, "Looking up record");

    let row = build_query_with_params(&query)
        .fetch_optional(&mut *connection)
        .instrument(info_span!("Look up record", grid = %plan.grid))
        .await?;

    row.as_ref().map(decode_record).transpose()
}

/// The statements of a read plan, formatted for humans.
#[derive(Debug, Clone, PartialEq)]
pub struct Explained {
    pub count_sql: String,
    pub rows_sql: String,
    pub params: Vec<Param>,
}

/// Render a read plan without running it.
pub fn explain(plan: &sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>) -> Explained {
    let count = plan.query.count_sql();
    let rows = plan.query.rows_sql();
    Explained {
        count_sql: pretty_print(&count.sql),
        rows_sql: pretty_print(&rows.sql),
        // both statements bind the same restriction, and the page adds no parameters
        params: rows.params,
    }
}

fn pretty_print(sql: &str) -> String {
    sqlformat::format(
        sql,
        &sqlformat::QueryParams::None,
        sqlformat::FormatOptions::default(),
    )
}

fn decode_record(row: &sqlx::sqlite::SqliteRow) -> Result<serde_json::Value, Error> {
    let text: String = row.try_get(sql::helpers::RECORD_COLUMN)?;
    Ok(serde_json::from_str(&text).map_err(QueryError::MalformedRecord)?)
}

/// Create a SQLx query based on our SQL query and bind our parameters to it.
pub(crate) fn build_query_with_params(
    query: &sql::string::SQL,
) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
    query
        .params
        .iter()
        .fold(sqlx::query(query.sql.as_str()), |sqlx_query, param| {
            match param {
                Param::String(string) => sqlx_query.bind(string.as_str()),
                Param::Integer(integer) => sqlx_query.bind(*integer),
                Param::Float(float) => sqlx_query.bind(*float),
                Param::Boolean(boolean) => sqlx_query.bind(*boolean),
                Param::Null => sqlx_query.bind(None::<String>),
            }
        })
}
