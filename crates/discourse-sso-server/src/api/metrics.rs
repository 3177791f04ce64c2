//! Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use discourse_sso_telemetry::PROMETHEUS_CONTENT_TYPE;

use super::router::AppState;

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        discourse_sso_telemetry::prometheus::render_metrics(&state.metrics),
    )
}
