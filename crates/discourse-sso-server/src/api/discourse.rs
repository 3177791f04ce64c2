//! Discourse SSO handshake endpoints.
//!
//! `GET /sso/discourse` is the entry point Discourse redirects users to.
//! `POST /sso/discourse/login` is the local login form that completes the
//! handshake and sends the user back to Discourse.

use axum::{
    extract::{rejection::FormRejection, rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use discourse_sso::{InitialPayload, NonceReference, SsoError};
use discourse_sso_telemetry::{
    log_inbound_accepted, log_inbound_rejected, log_login_completed, log_login_rejected,
    CompletionOutcome, InboundOutcome,
};
use serde::Deserialize;
use thiserror::Error;

use super::router::AppState;
use crate::error::ProblemDetails;

/// Detail returned for every rejected inbound request.
pub const INBOUND_REJECTED_DETAIL: &str = "Unable to verify signature";

/// Detail returned for every rejected login completion.
pub const LOGIN_REJECTED_DETAIL: &str = "Unable to complete sign-on";

/// Query parameters Discourse attaches to the SSO redirect.
#[derive(Debug, Deserialize)]
pub struct InboundParams {
    pub sso: Option<String>,
    pub sig: Option<String>,
}

/// Local login form.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(rename = "ssoRef")]
    pub sso_ref: String,
    pub username: String,
    pub password: String,
}

/// GET /sso/discourse
pub async fn handle_inbound(
    State(state): State<AppState>,
    params: Result<Query<InboundParams>, QueryRejection>,
) -> Response {
    let initial = match params {
        Ok(Query(InboundParams {
            sso: Some(sso),
            sig: Some(sig),
        })) => InitialPayload::new(restore_plus(sso), sig),
        Ok(_) => return reject_inbound(&state, "missing sso or sig parameter"),
        Err(e) => return reject_inbound(&state, &e.body_text()),
    };

    match state.provider.handle_inbound(initial) {
        Ok(reference) => {
            state.metrics.record_inbound(InboundOutcome::Accepted);
            log_inbound_accepted!(reference = %reference, "parked Discourse SSO request");
            found(state.provider.local_auth_redirect(&reference))
        }
        Err(e) => reject_inbound(&state, &e.to_string()),
    }
}

fn reject_inbound(state: &AppState, reason: &str) -> Response {
    state.metrics.record_inbound(InboundOutcome::Rejected);
    log_inbound_rejected!(reason, "rejected Discourse SSO request");
    ProblemDetails::forbidden(INBOUND_REJECTED_DETAIL).into_response()
}

/// Why a login completion was refused.
#[derive(Debug, Error)]
enum LoginFailure {
    #[error("SSO reference is not a valid identifier")]
    BadReference,

    #[error("invalid credentials for user '{0}'")]
    BadCredentials(String),

    #[error("invalid login form: {0}")]
    BadForm(String),

    #[error(transparent)]
    Sso(#[from] SsoError),
}

/// POST /sso/discourse/login
///
/// Credentials are checked before the reference is consumed, so a mistyped
/// password leaves the handshake open for another attempt.
pub async fn complete_login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    match login(&state, form) {
        Ok((username, url)) => {
            state.metrics.record_completion(CompletionOutcome::Redirected);
            log_login_completed!(username = %username, "redirecting to Discourse");
            found(url)
        }
        Err(e) => {
            state.metrics.record_completion(CompletionOutcome::Rejected);
            log_login_rejected!(reason = %e, "login completion rejected");
            ProblemDetails::forbidden(LOGIN_REJECTED_DETAIL).into_response()
        }
    }
}

fn login(
    state: &AppState,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<(String, String), LoginFailure> {
    let Form(form) = form.map_err(|e| LoginFailure::BadForm(e.body_text()))?;

    let reference =
        NonceReference::parse(form.sso_ref.trim()).map_err(|_| LoginFailure::BadReference)?;

    let identity = state
        .authenticator
        .authenticate(&form.username, &form.password)
        .ok_or_else(|| LoginFailure::BadCredentials(form.username.clone()))?;

    let url = state.provider.build_redirect(&reference, &identity)?;
    Ok((identity.username, url))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Query decoding turns a literal `+` into a space; base64 never contains
/// spaces, so map them back before the signature check.
fn restore_plus(sso: String) -> String {
    if sso.contains(' ') {
        sso.replace(' ', "+")
    } else {
        sso
    }
}
