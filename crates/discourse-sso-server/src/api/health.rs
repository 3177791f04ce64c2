//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use super::router::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Handshakes waiting for local login, including expired ones not yet swept.
    pub pending_nonces: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        pending_nonces: state.provider.store().len(),
    })
}
