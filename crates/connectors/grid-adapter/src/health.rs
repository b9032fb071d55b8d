//! Health check endpoint for the adapter.

use sqlx::SqlitePool;

/// Check the health of the adapter.
///
/// The database must answer a trivial query.
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    if one == 1 {
        Ok(())
    } else {
        Err(sqlx::Error::Protocol(format!(
            "health check answered {one} instead of 1"
        )))
    }
}
