//! The HTTP routes of the adapter.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use prometheus::Encoder;

use grid_models::{ExplainResponse, GridResponse};

use crate::grid::{self, GridAdapter};
use crate::health;

pub fn create_router(adapter: GridAdapter) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .route("/grids/:grid", post(post_grid))
        .route("/grids/:grid/explain", post(post_grid_explain))
        .with_state(Arc::new(adapter))
}

/// Every command answers 200 with an envelope, including failed ones.
async fn post_grid(
    State(adapter): State<Arc<GridAdapter>>,
    Path(grid): Path<String>,
    body: Bytes,
) -> Json<GridResponse> {
    Json(adapter.handle(&grid, &body).await)
}

async fn post_grid_explain(
    State(adapter): State<Arc<GridAdapter>>,
    Path(grid): Path<String>,
    body: Bytes,
) -> Result<Json<ExplainResponse>, (StatusCode, Json<GridResponse>)> {
    grid::parse_request(&body)
        .and_then(|request| adapter.explain(&grid, &request))
        .map(Json)
        .map_err(|err| (StatusCode::BAD_REQUEST, Json(GridResponse::error(err.to_string()))))
}

async fn get_health(State(adapter): State<Arc<GridAdapter>>) -> StatusCode {
    match health::health_check(&adapter.state().pool).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(err) => {
            tracing::error!(name = "Health check failed", body = %err, error = true);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn get_metrics(State(adapter): State<Arc<GridAdapter>>) -> Result<String, StatusCode> {
    let state = adapter.state();
    state.metrics.update_pool_metrics(&state.pool);

    let mut buffer = Vec::new();
    prometheus::TextEncoder::new()
        .encode(&state.metrics_registry.gather(), &mut buffer)
        .map_err(|err| {
            tracing::error!(name = "Metrics error", body = %err, error = true);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
