//! Payload encoding for the Discourse SSO wire format.
//!
//! A payload is a `key=value&key=value` string, base64-encoded with the
//! standard alphabet. The base64 string is what gets signed; URL-encoding
//! is only applied when the payload is placed in a query parameter.

use std::borrow::Cow;
use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::SsoError;

/// Decoded payload fields. A key without `=` maps to `None`.
pub type PayloadFields = HashMap<String, Option<String>>;

/// Serialize `fields` in the given order and base64-encode the result.
///
/// Values are not escaped. The field order is part of the signed contract
/// and is never sorted.
pub fn encode_canonical_payload(fields: &[(&str, &str)]) -> String {
    let raw = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    STANDARD.encode(raw.as_bytes())
}

/// Percent-encode a base64 payload for use as a query parameter value.
///
/// Encodes all bytes except unreserved characters (`A-Z a-z 0-9 - _ . ~`),
/// so `+`, `/` and `=` from the base64 alphabet are escaped.
pub fn url_encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Base64-decode a payload and parse it into fields.
///
/// ASCII whitespace inside the base64 text is ignored (some senders wrap
/// base64 output at 60 columns).
pub fn decode_and_parse(payload_b64: &str) -> Result<PayloadFields, SsoError> {
    let compact: String = payload_b64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SsoError::MalformedPayload(format!("invalid base64: {}", e)))?;

    let text = String::from_utf8(bytes)
        .map_err(|_| SsoError::MalformedPayload("payload is not valid UTF-8".into()))?;

    Ok(parse_fields(&text))
}

/// Parse a raw `key=value&...` string.
///
/// Each segment is split on its first `=` only. Keys are trimmed; empty keys
/// and keys starting with `#` are skipped. Later duplicates overwrite earlier
/// ones.
pub fn parse_fields(text: &str) -> PayloadFields {
    let mut fields = PayloadFields::new();

    for segment in text.split('&') {
        let (key, value) = match segment.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (segment, None),
        };

        let key = key.trim();
        if key.is_empty() || key.starts_with('#') {
            continue;
        }

        fields.insert(key.to_string(), value);
    }

    fields
}

/// Append `key=value` to `url`, URL-encoding the value.
///
/// Uses `?` or `&` depending on whether the URL already has a query, and
/// keeps any `#fragment` at the end.
pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match url.find('#') {
        Some(pos) => (&url[..pos], &url[pos..]),
        None => (url, ""),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    format!(
        "{}{}{}={}{}",
        base,
        separator,
        key,
        urlencoding::encode(value),
        fragment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(fields: &'a PayloadFields, key: &str) -> Option<&'a str> {
        fields.get(key).and_then(|v| v.as_deref())
    }

    #[test]
    fn test_encode_preserves_caller_order() {
        let encoded = encode_canonical_payload(&[("nonce", "abc123")]);
        assert_eq!(encoded, "bm9uY2U9YWJjMTIz");

        // Same fields in a different order must produce a different payload.
        let a = encode_canonical_payload(&[("b", "1"), ("a", "2")]);
        let b = encode_canonical_payload(&[("a", "2"), ("b", "1")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_does_not_escape_values() {
        let encoded = encode_canonical_payload(&[("email", "demisbellot@gmail.com")]);
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(bytes, b"email=demisbellot@gmail.com");
    }

    #[test]
    fn test_url_encode_escapes_base64_alphabet() {
        assert_eq!(url_encode("ab+/cd=="), "ab%2B%2Fcd%3D%3D");
        assert_eq!(url_encode("plain-_.~"), "plain-_.~");
    }

    #[test]
    fn test_decode_discourse_example_payload() {
        let fields = decode_and_parse("bm9uY2U9Y2I2ODI1MWVlZmI1MjExZTU4YzAwZmYxMzk1ZjBjMGI=").unwrap();
        assert_eq!(
            field(&fields, "nonce"),
            Some("cb68251eefb5211e58c00ff1395f0c0b")
        );
    }

    #[test]
    fn test_decode_ignores_wrapped_lines() {
        let fields =
            decode_and_parse("bm9uY2U9Y2I2ODI1MWVlZmI1MjExZTU4YzAw\nZmYxMzk1ZjBjMGI=\n").unwrap();
        assert_eq!(
            field(&fields, "nonce"),
            Some("cb68251eefb5211e58c00ff1395f0c0b")
        );
    }

    #[test]
    fn test_decode_splits_on_first_equals_only() {
        // "a=1&b=x=y&c"
        let fields = decode_and_parse("YT0xJmI9eD15JmM=").unwrap();
        assert_eq!(field(&fields, "a"), Some("1"));
        assert_eq!(field(&fields, "b"), Some("x=y"));
        assert_eq!(fields.get("c"), Some(&None));
    }

    #[test]
    fn test_decode_unicode_value() {
        // "name=Zoë"
        let fields = decode_and_parse("bmFtZT1ab8Or").unwrap();
        assert_eq!(field(&fields, "name"), Some("Zoë"));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_and_parse("not base64!!").unwrap_err();
        assert!(matches!(err, SsoError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let payload = STANDARD.encode([0xff, 0xfe, 0x3d]);
        let err = decode_and_parse(&payload).unwrap_err();
        assert!(matches!(err, SsoError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_skips_empty_and_comment_keys() {
        let fields = parse_fields("&=orphan&#comment=1& nonce =abc&&");
        assert_eq!(fields.len(), 1);
        assert_eq!(field(&fields, "nonce"), Some("abc"));
    }

    #[test]
    fn test_parse_keys_are_case_sensitive_and_last_write_wins() {
        let fields = parse_fields("Nonce=upper&nonce=first&nonce=second");
        assert_eq!(field(&fields, "Nonce"), Some("upper"));
        assert_eq!(field(&fields, "nonce"), Some("second"));
    }

    #[test]
    fn test_parse_empty_value_is_present() {
        let fields = parse_fields("name=");
        assert_eq!(field(&fields, "name"), Some(""));
    }

    #[test]
    fn test_append_query_param_without_query() {
        let reference = "0d3c9cf5-5b3a-4a0e-9f34-0d3f3b7b8a11";
        assert_eq!(
            append_query_param("/", "ssoRef", reference),
            format!("/?ssoRef={}", reference)
        );
    }

    #[test]
    fn test_append_query_param_with_query_and_fragment() {
        assert_eq!(
            append_query_param("https://id.example.com/login?next=home#form", "ssoRef", "r 1"),
            "https://id.example.com/login?next=home&ssoRef=r%201#form"
        );
        assert_eq!(
            append_query_param("/login?", "ssoRef", "abc"),
            "/login?ssoRef=abc"
        );
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        fn key_strategy() -> impl Strategy<Value = String> {
            "[a-z_][a-z0-9_]{0,11}"
        }

        // Values cannot contain `&`: the canonical form does not escape them.
        fn value_strategy() -> impl Strategy<Value = String> {
            "[^&]{0,24}"
        }

        proptest! {
            #[test]
            fn round_trip_recovers_fields(
                pairs in proptest::collection::btree_map(key_strategy(), value_strategy(), 1..8)
            ) {
                let fields: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();

                let encoded = encode_canonical_payload(&fields);
                let decoded = decode_and_parse(&encoded).unwrap();

                prop_assert_eq!(decoded.len(), pairs.len());
                for (k, v) in &pairs {
                    prop_assert_eq!(decoded.get(k), Some(&Some(v.clone())));
                }
            }

            #[test]
            fn url_encoding_is_transport_only(
                pairs in proptest::collection::btree_map(key_strategy(), value_strategy(), 1..4)
            ) {
                let fields: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();

                let encoded = encode_canonical_payload(&fields);
                let transported = url_encode(&encoded);
                let received = urlencoding::decode(&transported).unwrap();
                prop_assert_eq!(received.as_ref(), encoded.as_str());
            }
        }
    }
}
