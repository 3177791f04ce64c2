use thiserror::Error;

/// Errors produced by the SSO handshake.
///
/// `InvalidReference` deliberately covers unknown, consumed and expired
/// references alike; callers cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SsoError {
    /// Inbound payload HMAC does not match the shared secret.
    #[error("payload signature does not match")]
    InvalidSignature,

    /// Nonce reference is unknown, expired or already consumed.
    #[error("SSO reference is unknown, expired or already used")]
    InvalidReference,

    /// Payload could not be decoded or lacks a required field.
    #[error("malformed SSO payload: {0}")]
    MalformedPayload(String),

    /// No nonce store was configured for the provider.
    #[error("nonce store is not configured; it is required for Discourse SSO")]
    CacheUnavailable,

    /// Provider configuration is incomplete or invalid.
    #[error("invalid SSO configuration: {0}")]
    InvalidConfig(String),
}

impl SsoError {
    /// Whether this error belongs to startup rather than to a single request.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Self::CacheUnavailable | Self::InvalidConfig(_))
    }
}
