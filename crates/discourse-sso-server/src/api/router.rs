//! Axum router configuration.

use std::sync::Arc;

use axum::{
    http::Uri,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use discourse_sso::SsoProvider;
use discourse_sso_telemetry::MetricsRegistry;
use tower_http::trace::TraceLayer;

use super::{discourse, health, metrics};
use crate::auth::Authenticator;
use crate::error::ProblemDetails;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<SsoProvider>,
    /// Checks local credentials on the login form.
    pub authenticator: Arc<dyn Authenticator>,
    pub metrics: Arc<MetricsRegistry>,
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    ProblemDetails::not_found(format!("no route for {}", uri.path()))
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // SSO handshake
        .route("/sso/discourse", get(discourse::handle_inbound))
        .route("/sso/discourse/login", post(discourse::complete_login))
        // Operations
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .fallback(not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
