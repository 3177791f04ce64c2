//! Payload types exchanged with Discourse.

use crate::codec::encode_canonical_payload;
use crate::signer::{sign, SsoSecret};

/// Signed payload received on the initial redirect from Discourse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialPayload {
    /// Base64 payload (`sso` query parameter).
    pub payload: String,
    /// Hex HMAC-SHA256 of `payload` (`sig` query parameter).
    pub signature: String,
}

impl InitialPayload {
    pub fn new(payload: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            signature: signature.into(),
        }
    }
}

/// Identity supplied by the local authenticator once login succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

/// Fields sent back to Discourse after local authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPayload {
    pub nonce: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub external_id: String,
}

impl ReturnPayload {
    /// Build a return payload for `identity`, prefixing the external id with
    /// the name of the authentication source.
    pub fn for_identity(
        nonce: impl Into<String>,
        identity: &AuthenticatedIdentity,
        auth_source: &str,
    ) -> Self {
        Self {
            nonce: nonce.into(),
            name: identity.display_name.clone(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            external_id: format!("{}_{}", auth_source, identity.username),
        }
    }

    /// Fields in signing order: nonce, name, username, email, external_id.
    pub fn fields(&self) -> [(&str, &str); 5] {
        [
            ("nonce", self.nonce.as_str()),
            ("name", self.name.as_str()),
            ("username", self.username.as_str()),
            ("email", self.email.as_str()),
            ("external_id", self.external_id.as_str()),
        ]
    }

    /// Encode and sign the payload.
    pub fn sign(&self, secret: &SsoSecret) -> SignedPayload {
        let payload = encode_canonical_payload(&self.fields());
        let signature = sign(&payload, secret);
        SignedPayload { payload, signature }
    }
}

/// A base64 payload and its signature, ready to be placed in a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Base64 payload, not yet URL-encoded.
    pub payload: String,
    /// Lowercase hex signature over `payload`.
    pub signature: String,
}
