use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Service health as reported to load balancers and the admin frontend.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a dependency is unavailable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether the upload directory exists.
    pub storage_ready: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = analog_db::health_check(&state.pool).await.is_ok();
    let storage_ready = tokio::fs::metadata(&state.config.storage_dir)
        .await
        .is_ok_and(|m| m.is_dir());

    let status = if db_healthy && storage_ready {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_ready,
    })
}

/// Served at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
