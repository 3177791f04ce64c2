//! HMAC-SHA256 signing of SSO payloads.
//!
//! The signature is always computed over the base64 payload string exactly
//! as it travels (before URL-encoding, after base64-encoding). Discourse
//! verifies the same bytes.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::SsoError;

type HmacSha256 = Hmac<Sha256>;

/// Secret shared with the Discourse instance.
///
/// `Debug` is redacted so the value cannot leak through logs.
#[derive(Clone)]
pub struct SsoSecret(String);

impl SsoSecret {
    /// Wrap a shared secret. Empty secrets are rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, SsoError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SsoError::InvalidConfig("SSO secret must not be empty".into()));
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SsoSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SsoSecret(<redacted>)")
    }
}

/// Sign a base64 payload, returning the lowercase hex HMAC-SHA256.
pub fn sign(payload_b64: &str, secret: &SsoSecret) -> String {
    hex::encode(mac_for(payload_b64, secret).finalize().into_bytes())
}

/// Check `provided` against the signature of `payload_b64`.
///
/// Hex case is ignored. The digest comparison is constant-time.
pub fn verify(payload_b64: &str, secret: &SsoSecret, provided: &str) -> bool {
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    mac_for(payload_b64, secret).verify_slice(&provided).is_ok()
}

fn mac_for(payload_b64: &str, secret: &SsoSecret) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload_b64.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SsoSecret {
        SsoSecret::new(s).unwrap()
    }

    #[test]
    fn test_sign_discourse_reference_vector() {
        // Example from the Discourse SSO provider documentation; the payload
        // there carries a trailing newline.
        let payload = "bm9uY2U9Y2I2ODI1MWVlZmI1MjExZTU4YzAwZmYxMzk1ZjBjMGI=\n";
        let sig = sign(payload, &secret("d836444a9e4084d5b224a60c208dce14"));
        assert_eq!(
            sig,
            "2828aa29899722b35a2f191d34ef9b3ce695e0e6eeec47deb46d588d70c7cb56"
        );
    }

    #[test]
    fn test_sign_is_lowercase_hex() {
        let sig = sign("bm9uY2U9YWJjMTIz", &secret("a_test_secret"));
        assert_eq!(
            sig,
            "6a4e94774ffc261122f914445ecf6cfe655a5d8f5fd598080887a87c9fe08642"
        );
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_sign_deterministic() {
        let s = secret("a_test_secret");
        assert_eq!(sign("cGF5bG9hZA==", &s), sign("cGF5bG9hZA==", &s));
    }

    #[test]
    fn test_sign_depends_on_secret() {
        assert_ne!(
            sign("cGF5bG9hZA==", &secret("secret-one")),
            sign("cGF5bG9hZA==", &secret("secret-two"))
        );
    }

    #[test]
    fn test_sign_covers_base64_not_url_encoded_form() {
        let s = secret("a_test_secret");
        assert_ne!(sign("YWI+Yw==", &s), sign("YWI%2BYw%3D%3D", &s));
    }

    #[test]
    fn test_verify_accepts_own_signature() {
        let s = secret("a_test_secret");
        let sig = sign("bm9uY2U9YWJjMTIz", &s);
        assert!(verify("bm9uY2U9YWJjMTIz", &s, &sig));
    }

    #[test]
    fn test_verify_ignores_hex_case() {
        let s = secret("a_test_secret");
        let sig = sign("bm9uY2U9YWJjMTIz", &s).to_uppercase();
        assert!(verify("bm9uY2U9YWJjMTIz", &s, &sig));
    }

    #[test]
    fn test_verify_rejects_other_signatures() {
        let s = secret("a_test_secret");
        let other = sign("bm9uY2U9YWJjMTIz", &secret("another_secret"));
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, &other));
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, &"0".repeat(64)));
    }

    #[test]
    fn test_verify_rejects_malformed_signatures() {
        let s = secret("a_test_secret");
        let sig = sign("bm9uY2U9YWJjMTIz", &s);
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, ""));
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, "not-hex"));
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, &sig[..62]));
        assert!(!verify("bm9uY2U9YWJjMTIz", &s, &format!("{}00", sig)));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let s = secret("super-sensitive");
        let debug = format!("{:?}", s);
        assert!(!debug.contains("super-sensitive"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            SsoSecret::new(""),
            Err(SsoError::InvalidConfig(_))
        ));
    }
}
