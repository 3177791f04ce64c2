//! Structured logging setup and standard event names.
//!
//! Every log line emitted through the `log_*!` macros carries an `event`
//! field so handshake outcomes can be filtered without parsing messages.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log event names.
pub mod events {
    /// Service is starting up.
    pub const STARTUP: &str = "startup";

    /// Service is listening on a socket.
    pub const LISTENING: &str = "listening";

    /// Service is shutting down.
    pub const SHUTDOWN: &str = "shutdown";

    /// Signed payload from Discourse accepted and parked.
    pub const SSO_INBOUND_ACCEPTED: &str = "sso_inbound_accepted";

    /// Inbound payload rejected (bad signature or malformed request).
    pub const SSO_INBOUND_REJECTED: &str = "sso_inbound_rejected";

    /// Local login succeeded and the user was sent back to Discourse.
    pub const SSO_LOGIN_COMPLETED: &str = "sso_login_completed";

    /// Local login or reference resolution failed.
    pub const SSO_LOGIN_REJECTED: &str = "sso_login_rejected";

    /// Expired nonce entries were swept.
    pub const NONCE_SWEEP: &str = "nonce_sweep";
}

#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LISTENING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SHUTDOWN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_inbound_accepted {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SSO_INBOUND_ACCEPTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_inbound_rejected {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::SSO_INBOUND_REJECTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_login_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SSO_LOGIN_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_login_rejected {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::SSO_LOGIN_REJECTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_nonce_sweep {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::NONCE_SWEEP,
            $($field)*
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so these
    // tests cover configuration parsing rather than initialization.

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("PRETTY"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("invalid"), None);
    }

    #[test]
    fn test_event_names_are_distinct() {
        let names = [
            events::STARTUP,
            events::LISTENING,
            events::SHUTDOWN,
            events::SSO_INBOUND_ACCEPTED,
            events::SSO_INBOUND_REJECTED,
            events::SSO_LOGIN_COMPLETED,
            events::SSO_LOGIN_REJECTED,
            events::NONCE_SWEEP,
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
