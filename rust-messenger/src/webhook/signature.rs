//! Webhook authentication.
//!
//! POST deliveries are signed with HMAC-SHA1 over the raw body, keyed with
//! the app secret, and sent as `x-hub-signature: sha1=<hex>`.
//! Reference: https://developers.facebook.com/docs/messenger-platform/webhooks#security
//!
//! The GET subscription handshake is a plain token comparison and has
//! nothing to do with message integrity.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::{error, warn};

use crate::error::WebhookError;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Body returned when the handshake token does not match.
pub const HANDSHAKE_REJECTED: &str = "Error, wrong validation token.";

/// Compute the `sha1=<hex>` signature for `body`.
pub fn sign_payload(app_secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha1::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WebhookError::Configuration("invalid app secret"))?;
    mac.update(body);

    Ok(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify the `x-hub-signature` header against the exact body bytes.
///
/// The header is compared verbatim with `sha1=<lowercase hex>`; no case
/// folding or prefix normalization is applied.
///
/// # Errors
///
/// * [`WebhookError::Configuration`] when no app secret is configured. No
///   verification with an empty key is attempted.
/// * [`WebhookError::Integrity`] when the header is missing or does not match.
pub fn verify_signature(
    app_secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), WebhookError> {
    let app_secret = match app_secret {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            error!("webhook_app_secret_missing");
            return Err(WebhookError::Configuration("missing app secret"));
        }
    };

    let signature = match signature {
        Some(s) => s,
        None => {
            warn!(body_length = body.len(), "webhook_signature_missing");
            return Err(WebhookError::Integrity);
        }
    };

    let expected = sign_payload(app_secret, body)?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(&expected, signature) {
        warn!(
            body_length = body.len(),
            expected_length = expected.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
        return Err(WebhookError::Integrity);
    }

    Ok(())
}

/// Answer the GET subscription handshake.
///
/// Returns the challenge verbatim when `provided_token` equals the configured
/// verify token, otherwise `None`. An unconfigured verify token never matches.
pub fn verify_handshake<'a>(
    verify_token: Option<&str>,
    provided_token: Option<&str>,
    challenge: Option<&'a str>,
) -> Option<&'a str> {
    match (verify_token, provided_token) {
        (Some(expected), Some(provided)) if expected == provided => Some(challenge.unwrap_or("")),
        (None, _) => {
            warn!("webhook_verify_token_not_configured");
            None
        }
        _ => {
            error!("webhook_handshake_failed");
            None
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app-secret";
    const BODY: &[u8] = br#"{"object":"page","entry":[]}"#;

    #[test]
    fn test_sign_payload_known_vector() {
        // RFC 2202 test case 2
        let sig = sign_payload("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(sig, "sha1=effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn test_verify_signature_valid() {
        let sig = sign_payload(SECRET, BODY).unwrap();
        assert!(verify_signature(Some(SECRET), BODY, Some(&sig)).is_ok());
    }

    #[test]
    fn test_verify_signature_missing_secret() {
        let sig = sign_payload(SECRET, BODY).unwrap();
        for secret in [None, Some(""), Some("   ")] {
            assert!(matches!(
                verify_signature(secret, BODY, Some(&sig)),
                Err(WebhookError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_verify_signature_missing_header() {
        assert!(matches!(
            verify_signature(Some(SECRET), BODY, None),
            Err(WebhookError::Integrity)
        ));
    }

    #[test]
    fn test_verify_signature_requires_exact_format() {
        let sig = sign_payload(SECRET, BODY).unwrap();
        let bare = sig.trim_start_matches("sha1=").to_string();
        let upper = format!("sha1={}", bare.to_uppercase());
        let wrong_prefix = format!("SHA1={}", bare);

        for candidate in [bare, upper, wrong_prefix] {
            assert!(matches!(
                verify_signature(Some(SECRET), BODY, Some(&candidate)),
                Err(WebhookError::Integrity)
            ));
        }
    }

    #[test]
    fn test_verify_signature_any_body_bit_flip_fails() {
        let sig = sign_payload(SECRET, BODY).unwrap();

        for byte in 0..BODY.len() {
            for bit in 0..8 {
                let mut mutated = BODY.to_vec();
                mutated[byte] ^= 1 << bit;
                assert!(
                    verify_signature(Some(SECRET), &mutated, Some(&sig)).is_err(),
                    "flip of byte {} bit {} was accepted",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_verify_signature_any_signature_bit_flip_fails() {
        let sig = sign_payload(SECRET, BODY).unwrap();

        for byte in 0..sig.len() {
            for bit in 0..8 {
                let mut mutated = sig.clone().into_bytes();
                mutated[byte] ^= 1 << bit;
                // Flips that leave the string non-UTF-8 can't arrive as a header value
                let Ok(mutated) = String::from_utf8(mutated) else {
                    continue;
                };
                assert!(verify_signature(Some(SECRET), BODY, Some(&mutated)).is_err());
            }
        }
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let sig = sign_payload("other-secret", BODY).unwrap();
        assert!(verify_signature(Some(SECRET), BODY, Some(&sig)).is_err());
    }

    #[test]
    fn test_verify_handshake() {
        assert_eq!(
            verify_handshake(Some("tok"), Some("tok"), Some("12345")),
            Some("12345")
        );
        assert_eq!(verify_handshake(Some("tok"), Some("nope"), Some("12345")), None);
        assert_eq!(verify_handshake(Some("tok"), None, Some("12345")), None);
        assert_eq!(verify_handshake(None, Some("tok"), Some("12345")), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
