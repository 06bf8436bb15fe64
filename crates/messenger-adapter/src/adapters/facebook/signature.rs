//! `X-Hub-Signature-256` verification for Messenger webhook deliveries.
//!
//! The platform signs each POST body with HMAC-SHA256 keyed by the app
//! secret and sends `sha256=<hex>` in the header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::MessengerError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify the signature header value against the raw request body.
pub fn verify_hub_signature(
    app_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), MessengerError> {
    let signature_hex = signature.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
        MessengerError::SignatureInvalid(format!(
            "header value does not start with '{}'",
            SIGNATURE_PREFIX
        ))
    })?;
    let provided = hex::decode(signature_hex)
        .map_err(|e| MessengerError::SignatureInvalid(format!("invalid hex signature: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| MessengerError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    if computed.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
        return Err(MessengerError::SignatureInvalid(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Constant-time comparison for the handshake verify token.
pub fn tokens_match(configured: &str, provided: &str) -> bool {
    let expected = configured.as_bytes();
    let actual = provided.as_bytes();
    expected.len() == actual.len() && expected.ct_eq(actual).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"object":"page","entry":[]}"#;
        let signature = sign("app-secret", body);
        assert!(verify_hub_signature("app-secret", body, &signature).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let signature = sign("app-secret", b"original");
        match verify_hub_signature("app-secret", b"tampered", &signature) {
            Err(MessengerError::SignatureInvalid(msg)) => assert!(msg.contains("mismatch")),
            other => panic!("expected SignatureInvalid, got: {:?}", other),
        }
    }

    #[test]
    fn missing_prefix_fails() {
        let signature = sign("app-secret", b"body");
        let bare = signature.trim_start_matches("sha256=");
        match verify_hub_signature("app-secret", b"body", bare) {
            Err(MessengerError::SignatureInvalid(msg)) => assert!(msg.contains("sha256=")),
            other => panic!("expected SignatureInvalid, got: {:?}", other),
        }
    }

    #[test]
    fn non_hex_signature_fails() {
        let result = verify_hub_signature("app-secret", b"body", "sha256=zzzz");
        assert!(matches!(result, Err(MessengerError::SignatureInvalid(_))));
    }

    #[test]
    fn token_comparison() {
        assert!(tokens_match("verify-me", "verify-me"));
        assert!(!tokens_match("verify-me", "verify-you"));
        assert!(!tokens_match("short", "much-longer-token"));
        assert!(!tokens_match("verify-me", ""));
    }
}
