//! Execute mutation plans against the database.

use sqlx::SqliteConnection;
use tracing::{info_span, Instrument};

use query_engine_sql::sql;

use crate::error::Error;
use crate::query::build_query_with_params;

/// Run every statement of a mutation plan in order, returning the number of affected rows.
///
/// The caller owns the transaction the statements run in.
pub async fn execute(
    connection: &mut SqliteConnection,
    plan: &sql::execution_plan::ExecutionPlan<sql::execution_plan::Mutation>,
) -> Result<u64, Error> {
    let mut rows_affected = 0;
    for statement in &plan.query.statements {
        let query = statement.query_sql();
        tracing::debug!(grid = %plan.grid, sql = %query.sql, params = ?query.params, "Executing statement");

        let result = build_query_with_params(&query)
            .execute(&mut *connection)
            .instrument(info_span!("Execute statement", grid = %plan.grid))
            .await?;
        rows_affected += result.rows_affected();
    }
    Ok(rows_affected)
}
