//! Webhook `x-signature` verification.
//!
//! The gateway sends `x-signature: ts=<unix>,v1=<hex hmac>` and an
//! `x-request-id`. The HMAC-SHA256, keyed with the webhook secret, covers the
//! manifest `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::PaymentError;

/// Parsed `x-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: String,
    pub v1: String,
}

impl SignatureHeader {
    /// Parse `ts=...,v1=...` in any order, ignoring unknown parts.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` when either part is missing.
    pub fn parse(header: &str) -> Result<Self, PaymentError> {
        let mut ts = None;
        let mut v1 = None;

        for part in header.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key.trim() {
                    "ts" => ts = Some(value.trim().to_owned()),
                    "v1" => v1 = Some(value.trim().to_owned()),
                    _ => {}
                }
            }
        }

        match (ts, v1) {
            (Some(ts), Some(v1)) if !ts.is_empty() && !v1.is_empty() => Ok(Self { ts, v1 }),
            _ => Err(PaymentError::InvalidSignature(
                "malformed x-signature header".to_owned(),
            )),
        }
    }
}

/// The signed manifest. Alphanumeric ids are lowercased by the gateway.
fn manifest(data_id: &str, request_id: &str, ts: &str) -> String {
    format!(
        "id:{};request-id:{request_id};ts:{ts};",
        data_id.to_ascii_lowercase()
    )
}

/// Check a webhook signature.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` for a malformed header or a
/// mismatching HMAC.
pub fn verify_signature(
    secret: &str,
    header: &str,
    request_id: &str,
    data_id: &str,
) -> Result<(), PaymentError> {
    let parsed = SignatureHeader::parse(header)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(manifest(data_id, request_id, &parsed.ts).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(&expected, &parsed.v1.to_ascii_lowercase()) {
        return Err(PaymentError::InvalidSignature("signature mismatch".to_owned()));
    }
    Ok(())
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Sign a manifest the way the gateway does. Used by tests of webhook callers.
#[must_use]
pub fn sign(secret: &str, request_id: &str, data_id: &str, ts: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(manifest(data_id, request_id, ts).as_bytes());
    Some(format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "b6f1c0a2e9d84f3c";

    #[test]
    fn test_parse_header_any_order() {
        let parsed = SignatureHeader::parse("v1=abc, ts=1704908010").unwrap();
        assert_eq!(parsed.ts, "1704908010");
        assert_eq!(parsed.v1, "abc");
        assert!(SignatureHeader::parse("ts=1704908010").is_err());
        assert!(SignatureHeader::parse("").is_err());
    }

    #[test]
    fn test_manifest_format() {
        assert_eq!(
            manifest("ABC123", "req-1", "1704908010"),
            "id:abc123;request-id:req-1;ts:1704908010;"
        );
    }

    #[test]
    fn test_valid_signature() {
        let header = sign(SECRET, "req-1", "123456", "1704908010").unwrap();
        assert!(verify_signature(SECRET, &header, "req-1", "123456").is_ok());
    }

    #[test]
    fn test_tampered_fields_fail() {
        let header = sign(SECRET, "req-1", "123456", "1704908010").unwrap();
        assert!(verify_signature(SECRET, &header, "req-1", "654321").is_err());
        assert!(verify_signature(SECRET, &header, "req-2", "123456").is_err());
        assert!(verify_signature("other-secret", &header, "req-1", "123456").is_err());

        let forged = header.replace("ts=1704908010", "ts=1704908011");
        assert!(matches!(
            verify_signature(SECRET, &forged, "req-1", "123456"),
            Err(PaymentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
