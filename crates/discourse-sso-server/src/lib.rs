//! HTTP service for the Discourse SSO provider.
//!
//! Wires [`discourse_sso::SsoProvider`] to axum routes, a file-backed
//! user directory and the telemetry crate. The `discourse-sso` binary is a
//! thin CLI over [`server::run`].

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
