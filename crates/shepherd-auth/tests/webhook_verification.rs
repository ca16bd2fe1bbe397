//! Signed-webhook verification: header parsing, the replay window,
//! multi-candidate rotation signatures, and the verified-body contract

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shepherd_auth::error::WebhookError;
use shepherd_auth::webhook::WebhookVerifier;

type HmacSha256 = Hmac<Sha256>;

const SECRET: &str = "whsec_test_4f8a";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// `hex(HMAC-SHA256(secret, "<timestamp>.<body>"))`, the provider's scheme
fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn header_with(timestamp: i64, signatures: &[&str]) -> String {
    let mut header = format!("t={timestamp}");
    for signature in signatures {
        header.push_str(",v1=");
        header.push_str(signature);
    }
    header
}

#[test]
fn valid_signature_returns_the_body_unchanged() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = br#"{"id":"evt_1","type":"customer.subscription.updated","data":{"object":{}}}"#;
    let timestamp = now();
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    let verified = verifier.verify(body, Some(&header)).expect("should verify");
    assert_eq!(verified, body);
}

#[test]
fn timestamp_too_old_is_rejected_despite_valid_signature() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"{}";
    let timestamp = now() - 400;
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    let err = verifier.verify(body, Some(&header)).unwrap_err();
    assert!(
        matches!(err, WebhookError::StaleTimestamp { timestamp: t } if t == timestamp),
        "got {err:?}"
    );
}

#[test]
fn timestamp_from_the_future_is_rejected_too() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"{}";
    let timestamp = now() + 400;
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    let err = verifier.verify(body, Some(&header)).unwrap_err();
    assert!(matches!(err, WebhookError::StaleTimestamp { .. }), "got {err:?}");
}

#[test]
fn timestamp_inside_the_window_is_accepted() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"{}";
    let timestamp = now() - 299;
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    assert!(verifier.verify(body, Some(&header)).is_ok());
}

#[test]
fn custom_tolerance_widens_the_window() {
    let verifier = WebhookVerifier::new(SECRET).with_tolerance(Duration::from_secs(3600));
    let body = b"{}";
    let timestamp = now() - 1000;
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    assert!(verifier.verify(body, Some(&header)).is_ok());
}

#[test]
fn any_candidate_may_match_during_secret_rotation() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = br#"{"id":"evt_2"}"#;
    let timestamp = now();
    // First candidate came from the old secret; only the second matches.
    let old = sign("whsec_retired", timestamp, body);
    let current = sign(SECRET, timestamp, body);
    let header = header_with(timestamp, &[&old, &current]);

    assert!(verifier.verify(body, Some(&header)).is_ok());
}

#[test]
fn non_hex_candidate_is_skipped_not_fatal() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"{}";
    let timestamp = now();
    let header = header_with(timestamp, &["zzzz-not-hex", &sign(SECRET, timestamp, body)]);

    assert!(verifier.verify(body, Some(&header)).is_ok());
}

#[test]
fn wrong_secret_is_a_signature_mismatch() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"{}";
    let timestamp = now();
    let header = header_with(timestamp, &[&sign("whsec_other", timestamp, body)]);

    let err = verifier.verify(body, Some(&header)).unwrap_err();
    assert!(matches!(err, WebhookError::SignatureMismatch), "got {err:?}");
}

#[test]
fn tampered_body_is_a_signature_mismatch() {
    let verifier = WebhookVerifier::new(SECRET);
    let timestamp = now();
    let header = header_with(
        timestamp,
        &[&sign(SECRET, timestamp, br#"{"amount":100}"#)],
    );

    let err = verifier
        .verify(br#"{"amount":999}"#, Some(&header))
        .unwrap_err();
    assert!(matches!(err, WebhookError::SignatureMismatch), "got {err:?}");
}

#[test]
fn missing_header_is_rejected() {
    let verifier = WebhookVerifier::new(SECRET);
    let err = verifier.verify(b"{}", None).unwrap_err();
    assert!(matches!(err, WebhookError::MissingHeader));
}

#[test]
fn malformed_headers_are_rejected() {
    let verifier = WebhookVerifier::new(SECRET);
    for header in ["", "v1=deadbeef", "t=not-a-number,v1=deadbeef", "t=123"] {
        let err = verifier.verify(b"{}", Some(header)).unwrap_err();
        assert!(
            matches!(err, WebhookError::MalformedHeader(_)),
            "header {header:?} gave {err:?}"
        );
    }
}

#[test]
fn verify_and_parse_yields_a_typed_event() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = br#"{
        "id": "evt_1PqX",
        "type": "checkout.session.completed",
        "data": { "object": { "customer": "cus_9", "metadata": { "user_id": "user_29w" } } }
    }"#;
    let timestamp = now();
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    let event = verifier
        .verify_and_parse(body, Some(&header))
        .expect("verified body should parse");
    assert_eq!(event.event_type, "checkout.session.completed");
    assert_eq!(event.data.object["metadata"]["user_id"], "user_29w");
}

#[test]
fn verify_and_parse_rejects_non_event_bodies() {
    let verifier = WebhookVerifier::new(SECRET);
    let body = b"[1, 2, 3]";
    let timestamp = now();
    let header = header_with(timestamp, &[&sign(SECRET, timestamp, body)]);

    let err = verifier.verify_and_parse(body, Some(&header)).unwrap_err();
    assert!(matches!(err, WebhookError::Payload(_)), "got {err:?}");
}
