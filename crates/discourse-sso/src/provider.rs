//! Handshake orchestration.
//!
//! Leg A validates the inbound payload from Discourse and parks it in the
//! nonce store. Leg B runs after local login: it takes the parked payload,
//! extracts the nonce and builds the signed redirect back to Discourse.

use std::sync::Arc;
use std::time::Duration;

use crate::codec::{append_query_param, decode_and_parse, url_encode};
use crate::nonce_store::{NonceReference, NonceStore};
use crate::payload::{AuthenticatedIdentity, InitialPayload, ReturnPayload};
use crate::signer::{verify, SsoSecret};
use crate::SsoError;

/// Query parameter carrying the nonce reference to local auth.
pub const SSO_REF_PARAM: &str = "ssoRef";

/// Path on the Discourse instance that accepts the signed return payload.
pub const DISCOURSE_LOGIN_PATH: &str = "/session/sso_login";

/// How long an inbound payload waits for local login (10 minutes).
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(600);

/// Default prefix for the `external_id` sent to Discourse.
pub const DEFAULT_AUTH_SOURCE: &str = "local";

/// Server side of the Discourse SSO handshake.
///
/// Built once at startup and shared; holds only configuration and a handle
/// to the nonce store.
pub struct SsoProvider {
    secret: SsoSecret,
    local_auth_url: String,
    discourse_url: String,
    auth_source: String,
    nonce_ttl: Duration,
    store: Arc<dyn NonceStore>,
}

impl SsoProvider {
    pub fn builder() -> SsoProviderBuilder {
        SsoProviderBuilder::default()
    }

    /// Leg A: verify the inbound payload and park it under a new reference.
    pub fn handle_inbound(&self, initial: InitialPayload) -> Result<NonceReference, SsoError> {
        if !verify(&initial.payload, &self.secret, &initial.signature) {
            tracing::debug!("inbound SSO payload failed signature check");
            return Err(SsoError::InvalidSignature);
        }

        let reference = NonceReference::generate();
        self.store.put(reference, initial, self.nonce_ttl);
        tracing::debug!(reference = %reference, "parked inbound SSO payload");

        Ok(reference)
    }

    /// URL of the local login entry point with the reference attached.
    pub fn local_auth_redirect(&self, reference: &NonceReference) -> String {
        append_query_param(&self.local_auth_url, SSO_REF_PARAM, &reference.to_string())
    }

    /// Consume the parked payload for `reference` and return its nonce.
    ///
    /// The reference is consumed even when the payload turns out to be
    /// malformed.
    pub fn resolve_nonce(&self, reference: &NonceReference) -> Result<String, SsoError> {
        let initial = self
            .store
            .take_once(reference)
            .ok_or(SsoError::InvalidReference)?;

        let mut fields = decode_and_parse(&initial.payload)?;
        match fields.remove("nonce") {
            Some(Some(nonce)) if !nonce.is_empty() => Ok(nonce),
            _ => Err(SsoError::MalformedPayload(
                "payload does not carry a nonce".into(),
            )),
        }
    }

    /// Leg B: build the signed redirect to Discourse for `identity`.
    pub fn build_redirect(
        &self,
        reference: &NonceReference,
        identity: &AuthenticatedIdentity,
    ) -> Result<String, SsoError> {
        let nonce = self.resolve_nonce(reference)?;
        let payload = ReturnPayload::for_identity(nonce, identity, &self.auth_source);
        tracing::debug!(
            reference = %reference,
            username = %identity.username,
            "built Discourse SSO return payload"
        );
        Ok(self.redirect_for(&payload))
    }

    /// Sign `payload` and format the Discourse login URL.
    ///
    /// Only `sso` is URL-encoded; `sig` is plain hex.
    pub fn redirect_for(&self, payload: &ReturnPayload) -> String {
        let signed = payload.sign(&self.secret);
        format!(
            "{}{}?sso={}&sig={}",
            self.discourse_url,
            DISCOURSE_LOGIN_PATH,
            url_encode(&signed.payload),
            signed.signature
        )
    }

    pub fn nonce_ttl(&self) -> Duration {
        self.nonce_ttl
    }

    pub fn auth_source(&self) -> &str {
        &self.auth_source
    }

    /// Handle to the backing nonce store.
    pub fn store(&self) -> &Arc<dyn NonceStore> {
        &self.store
    }
}

/// Builder for [`SsoProvider`].
#[derive(Default)]
pub struct SsoProviderBuilder {
    secret: Option<String>,
    local_auth_url: Option<String>,
    discourse_url: Option<String>,
    auth_source: Option<String>,
    nonce_ttl: Option<Duration>,
    store: Option<Arc<dyn NonceStore>>,
}

impl SsoProviderBuilder {
    /// Shared secret configured on the Discourse side.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Local login entry point the Entry Handler redirects to.
    pub fn local_auth_url(mut self, url: impl Into<String>) -> Self {
        self.local_auth_url = Some(url.into());
        self
    }

    /// Base URL of the Discourse instance.
    pub fn discourse_url(mut self, url: impl Into<String>) -> Self {
        self.discourse_url = Some(url.into());
        self
    }

    pub fn auth_source(mut self, name: impl Into<String>) -> Self {
        self.auth_source = Some(name.into());
        self
    }

    pub fn nonce_ttl(mut self, ttl: Duration) -> Self {
        self.nonce_ttl = Some(ttl);
        self
    }

    pub fn nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and build the provider.
    ///
    /// Fails with `CacheUnavailable` when no nonce store was supplied.
    pub fn build(self) -> Result<SsoProvider, SsoError> {
        let store = self.store.ok_or(SsoError::CacheUnavailable)?;

        let secret = SsoSecret::new(
            self.secret
                .ok_or_else(|| SsoError::InvalidConfig("SSO secret is required".into()))?,
        )?;

        let local_auth_url = non_empty(self.local_auth_url, "local auth URL")?;

        // Exactly one trailing slash is dropped; the login path supplies its own.
        let discourse_url = non_empty(self.discourse_url, "Discourse server URL")?;
        let discourse_url = discourse_url
            .strip_suffix('/')
            .unwrap_or(&discourse_url)
            .to_string();
        if discourse_url.is_empty() {
            return Err(SsoError::InvalidConfig(
                "Discourse server URL is required".into(),
            ));
        }

        let auth_source = self
            .auth_source
            .unwrap_or_else(|| DEFAULT_AUTH_SOURCE.to_string());

        Ok(SsoProvider {
            secret,
            local_auth_url,
            discourse_url,
            auth_source,
            nonce_ttl: self.nonce_ttl.unwrap_or(DEFAULT_NONCE_TTL),
            store,
        })
    }
}

fn non_empty(value: Option<String>, what: &str) -> Result<String, SsoError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SsoError::InvalidConfig(format!("{} is required", what))),
    }
}
