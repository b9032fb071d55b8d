//! A seeded in-memory database and an adapter serving the static configuration.

use std::sync::Arc;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Executor;

use grid_adapter::grid::GridAdapter;
use grid_adapter::state::State;
use grid_adapter_configuration::environment::FixedEnvironment;
use grid_adapter_configuration::Configuration;

use crate::deployment::{helpers::get_path_from_project_root, STATIC_DEPLOYMENT_PATH};

/// The schema and rows every test database starts from.
pub const FIXTURE: &str = include_str!("../../../../static/fixture.sql");

pub const IN_MEMORY_URI: &str = "sqlite::memory:";

/// A pool over a fresh in-memory database seeded with the fixture.
///
/// The pool keeps its single connection open: the database lives as long as it does.
pub async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(IN_MEMORY_URI)
        .await
        .expect("an in-memory database is always available");
    pool.execute(FIXTURE).await.expect("the fixture is valid");
    pool
}

/// The runtime configuration of the static deployment.
pub async fn static_configuration() -> Configuration {
    let directory = get_path_from_project_root(STATIC_DEPLOYMENT_PATH);
    let parsed = grid_adapter_configuration::parse_configuration(&directory)
        .await
        .expect("the static configuration parses");
    grid_adapter_configuration::make_runtime_configuration(
        parsed,
        FixedEnvironment::from([(
            grid_adapter_configuration::DEFAULT_CONNECTION_URI_VARIABLE.into(),
            IN_MEMORY_URI.into(),
        )]),
    )
    .expect("the static configuration is valid")
}

/// An adapter over the static configuration and the given pool.
pub async fn create_adapter(pool: SqlitePool) -> GridAdapter {
    let _ = env_logger::builder().is_test(true).try_init();

    let configuration = static_configuration().await;
    let state = State::with_pool(pool).expect("metrics register once per state");
    GridAdapter::new(Arc::new(configuration), Arc::new(state))
}

/// Creates a router with a fresh state from the test deployment.
pub async fn create_router(pool: SqlitePool) -> axum::Router {
    grid_adapter::routes::create_router(create_adapter(pool).await)
}
