//! Health check endpoint (no auth)

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use super::buildinfo::get_build_info;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub database: String,
}

/// GET /health
///
/// Reports `degraded` when the database does not answer.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            warn!("Health check: database unavailable: {}", e);
            "unavailable".to_string()
        }
    };

    Json(HealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" }.to_string(),
        module: "digipath-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    })
}

/// Service info routes outside the versioned API
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/build_info", get(get_build_info))
}
