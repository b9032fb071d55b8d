//! Transient state used by the adapter.
//!
//! This is initialized on startup.

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{info_span, Instrument};

use grid_adapter_configuration::Configuration;
use query_engine_execution::metrics;

/// State for our adapter.
#[derive(Clone)]
pub struct State {
    pub pool: SqlitePool,
    pub metrics: metrics::Metrics,
    pub metrics_registry: prometheus::Registry,
}

impl State {
    /// Wrap an existing pool, registering the adapter's metrics.
    pub fn with_pool(pool: SqlitePool) -> Result<State, InitializationError> {
        let mut metrics_registry = prometheus::Registry::new();
        let metrics = metrics::Metrics::initialize(&mut metrics_registry)
            .map_err(InitializationError::MetricsError)?;
        Ok(State {
            pool,
            metrics,
            metrics_registry,
        })
    }
}

/// Create a connection pool and wrap it inside an adapter State.
pub async fn create_state(configuration: &Configuration) -> Result<State, InitializationError> {
    let pool = create_pool(configuration)
        .instrument(info_span!("Create connection pool"))
        .await?;

    let state = async { State::with_pool(pool) }
        .instrument(info_span!("Setup metrics"))
        .await?;

    state.metrics.update_pool_metrics(&state.pool);
    Ok(state)
}

/// Create a connection pool with default settings.
async fn create_pool(configuration: &Configuration) -> Result<SqlitePool, InitializationError> {
    let connect_options = configuration
        .connection_uri
        .parse::<SqliteConnectOptions>()
        .map_err(InitializationError::UnableToCreatePool)?
        .foreign_keys(true);

    let pool_settings = &configuration.pool_settings;
    SqlitePoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.pool_timeout))
        .idle_timeout(pool_settings.idle_timeout.map(Duration::from_secs))
        .max_lifetime(pool_settings.connection_lifetime.map(Duration::from_secs))
        .connect_with(connect_options)
        .await
        .map_err(InitializationError::UnableToCreatePool)
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}
