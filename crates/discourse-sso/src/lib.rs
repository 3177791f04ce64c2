//! Discourse SSO provider primitives.
//!
//! Implements the server side of the Discourse "payload + HMAC signature"
//! single sign-on handshake:
//!
//! - [`codec`]: canonical payload encoding and parsing
//! - [`signer`]: HMAC-SHA256 signing and constant-time verification
//! - [`nonce_store`]: single-use, TTL-bound correlation of the two legs
//! - [`provider`]: orchestration of inbound validation and outbound redirects
//!
//! Has no HTTP framework dependency; the server crate adapts it to routes.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use discourse_sso::{MemoryNonceStore, SsoProvider};
//!
//! let provider = SsoProvider::builder()
//!     .secret("a_test_secret")
//!     .local_auth_url("/login")
//!     .discourse_url("https://forum.example.com/")
//!     .nonce_store(Arc::new(MemoryNonceStore::new()))
//!     .build()
//!     .unwrap();
//! # let _ = provider;
//! ```

pub mod codec;
mod error;
pub mod nonce_store;
pub mod payload;
pub mod provider;
pub mod signer;

pub use error::SsoError;
pub use nonce_store::{MemoryNonceStore, NonceReference, NonceStore};
pub use payload::{AuthenticatedIdentity, InitialPayload, ReturnPayload, SignedPayload};
pub use provider::{SsoProvider, SsoProviderBuilder, DEFAULT_NONCE_TTL, SSO_REF_PARAM};
pub use signer::SsoSecret;
