//! Billing-webhook signature verification
//!
//! The billing provider signs every delivery with a shared secret. The
//! signature header has the form
//!
//! ```text
//! t=<unix-seconds>,v1=<hex-hmac>[,v1=<hex-hmac>...]
//! ```
//!
//! where each `v1` value is an HMAC-SHA256 over `"<timestamp>.<body>"`.
//! Several `v1` candidates appear while the provider rolls its secret, so
//! verification is any-match over all of them, not positional.
//!
//! Two things are easy to get wrong here and are locked in by this module:
//! the MAC is computed over the *raw* request body (re-serializing parsed
//! JSON would not byte-match what was signed), and candidate comparison is
//! constant time.

pub mod event;

pub use event::BillingEvent;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Default replay window: five minutes either side of now
const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Verifier for signed billing-webhook deliveries
///
/// # Example
///
/// ```rust,no_run
/// use shepherd_auth::WebhookVerifier;
///
/// let verifier = WebhookVerifier::new("whsec_...");
///
/// # let (body, header): (&[u8], Option<&str>) = (b"{}", None);
/// // body is the unmodified request body; header is the raw
/// // `stripe-signature`-style header value, if one was sent.
/// match verifier.verify(body, header) {
///     Ok(verified) => { /* safe to parse */ }
///     Err(err) => { /* respond 400, do not process */ }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    /// Shared signing secret
    secret: SecretString,
    /// Replay tolerance window
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Create a verifier with the default five-minute tolerance
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Create a verifier with the tolerance from deployment configuration
    pub fn from_config(secret: impl Into<String>, config: &AuthConfig) -> Self {
        Self::new(secret).with_tolerance(config.webhook_tolerance)
    }

    /// Adjust the replay tolerance window
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify a delivery and hand back the untouched raw body
    ///
    /// Returning the input slice is the point: the caller must parse what
    /// was verified, not a copy it re-serialized along the way.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::MissingHeader`] - `signature_header` was `None`
    /// - [`WebhookError::MalformedHeader`] - no parsable `t` field or no
    ///   `v1` candidates
    /// - [`WebhookError::StaleTimestamp`] - the signed timestamp is outside
    ///   the tolerance window (replay protection)
    /// - [`WebhookError::SignatureMismatch`] - no candidate matched the
    ///   locally computed HMAC
    pub fn verify<'a>(
        &self,
        body: &'a [u8],
        signature_header: Option<&str>,
    ) -> Result<&'a [u8], WebhookError> {
        let header = signature_header.ok_or(WebhookError::MissingHeader)?;
        let parsed = SignatureHeader::parse(header)?;

        let age = unix_now().abs_diff(parsed.timestamp);
        if age > self.tolerance.as_secs() {
            warn!(
                timestamp = parsed.timestamp,
                age_secs = age,
                "webhook timestamp outside tolerance window"
            );
            return Err(WebhookError::StaleTimestamp {
                timestamp: parsed.timestamp,
            });
        }

        // MAC over "<timestamp>.<body>" - the timestamp exactly as it
        // appeared in the header, the body exactly as it arrived.
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::SignatureMismatch)?;
        mac.update(parsed.raw_timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        // Any-match over the candidates; non-hex candidates are skipped
        // rather than fatal so one bad entry cannot mask a valid rotation
        // signature. Comparison is constant time.
        let matched = parsed.candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| bool::from(bytes.as_slice().ct_eq(expected.as_slice())))
                .unwrap_or(false)
        });

        if !matched {
            warn!(
                candidates = parsed.candidates.len(),
                "webhook signature mismatch"
            );
            return Err(WebhookError::SignatureMismatch);
        }

        debug!(timestamp = parsed.timestamp, "webhook signature verified");
        Ok(body)
    }

    /// Verify a delivery and parse it into a [`BillingEvent`] in one step
    ///
    /// # Errors
    ///
    /// Everything [`verify`] returns, plus [`WebhookError::Payload`] when
    /// the verified body is not an event envelope.
    ///
    /// [`verify`]: WebhookVerifier::verify
    pub fn verify_and_parse(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<BillingEvent, WebhookError> {
        let verified = self.verify(body, signature_header)?;
        BillingEvent::parse(verified)
    }
}

/// Parsed `t=...,v1=...` signature header
#[derive(Debug)]
struct SignatureHeader<'a> {
    /// Timestamp exactly as received - this is what was signed
    raw_timestamp: &'a str,
    timestamp: i64,
    candidates: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, WebhookError> {
        let mut raw_timestamp = None;
        let mut candidates = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => raw_timestamp = Some(value),
                Some(("v1", value)) => candidates.push(value),
                // Unknown schemes (v0=... from older secret formats) are ignored
                _ => {}
            }
        }

        let raw_timestamp = raw_timestamp.ok_or_else(|| {
            WebhookError::MalformedHeader("missing timestamp field".to_string())
        })?;
        let timestamp: i64 = raw_timestamp.parse().map_err(|_| {
            WebhookError::MalformedHeader("timestamp is not an integer".to_string())
        })?;
        if candidates.is_empty() {
            return Err(WebhookError::MalformedHeader(
                "no v1 signature candidates".to_string(),
            ));
        }

        Ok(Self {
            raw_timestamp,
            timestamp,
            candidates,
        })
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
