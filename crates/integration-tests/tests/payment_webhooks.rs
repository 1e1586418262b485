//! Webhook signature checks, as the storefront applies them to gateway
//! notifications.

#![allow(clippy::unwrap_used)]

use vivero_storefront::services::payments::{
    SignatureHeader, parse_payment_id, sign, verify_signature,
};

const SECRET: &str = "whsec-integration-0123456789";
const REQUEST_ID: &str = "bb56a2f1-6aae-46ac-982e-9dcd3581d08e";
const TS: &str = "1742505638683";

#[test]
fn test_gateway_signature_accepted() {
    let header = sign(SECRET, REQUEST_ID, "123456789", TS).unwrap();
    assert!(verify_signature(SECRET, &header, REQUEST_ID, "123456789").is_ok());
}

#[test]
fn test_signature_bound_to_payment_and_request() {
    let header = sign(SECRET, REQUEST_ID, "123456789", TS).unwrap();

    assert!(verify_signature(SECRET, &header, REQUEST_ID, "987654321").is_err());
    assert!(verify_signature(SECRET, &header, "another-request", "123456789").is_err());
    assert!(verify_signature("other-secret", &header, REQUEST_ID, "123456789").is_err());
}

#[test]
fn test_tampered_timestamp_rejected() {
    let header = sign(SECRET, REQUEST_ID, "123456789", TS).unwrap();
    let parsed = SignatureHeader::parse(&header).unwrap();
    let tampered = format!("ts=1742505999999,v1={}", parsed.v1);

    assert!(verify_signature(SECRET, &tampered, REQUEST_ID, "123456789").is_err());
}

#[test]
fn test_header_parts_in_any_order() {
    let header = sign(SECRET, REQUEST_ID, "42", TS).unwrap();
    let parsed = SignatureHeader::parse(&header).unwrap();
    let reordered = format!("v1={}, ts={}", parsed.v1.to_uppercase(), parsed.ts);

    assert!(verify_signature(SECRET, &reordered, REQUEST_ID, "42").is_ok());
}

#[test]
fn test_payment_ids_are_digits_only() {
    assert_eq!(parse_payment_id(" 123456789 ").unwrap(), "123456789");
    for bad in ["", "abc", "12 34", "../orders", &"9".repeat(33)] {
        assert!(parse_payment_id(bad).is_err(), "{bad:?}");
    }
}
