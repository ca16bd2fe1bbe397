//! Error types for credential verification
//!
//! Every variant here is terminal for the request being served: the
//! verifiers never retry or recover internally. Callers are expected to map
//! token errors to an opaque `401` and webhook errors to an opaque `400` at
//! the HTTP boundary, so none of the `Display` messages carry token or
//! secret material. The `kind()` accessors give a stable label for
//! structured logs, which is where the specific failure belongs.

use thiserror::Error;

/// Error fetching or decoding the identity provider's key set
#[derive(Debug, Error)]
pub enum JwksError {
    /// The key-set endpoint could not be reached
    #[error("key-set fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The key-set endpoint answered with a non-success status
    #[error("key-set endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    /// The response body was not a valid key-set document
    #[error("invalid key-set document: {0}")]
    Decode(String),
}

impl JwksError {
    /// Stable label for structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "jwks_unreachable",
            Self::Status(_) => "jwks_error_status",
            Self::Decode(_) => "jwks_decode",
        }
    }
}

/// Error verifying a bearer session token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not a structurally valid three-segment compact JWS
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The `exp` claim is in the past
    #[error("token expired at {expired_at}")]
    Expired {
        /// The `exp` claim value, Unix seconds
        expired_at: u64,
    },

    /// No key in the current key set matches the token's `kid` header
    #[error("no verification key matches the token")]
    UnknownKey {
        /// The `kid` the token named, if it named one at all
        kid: Option<String>,
    },

    /// RSA-SHA256 signature verification failed
    #[error("token signature verification failed")]
    InvalidSignature,

    /// The key set could not be obtained
    #[error(transparent)]
    Jwks(#[from] JwksError),
}

impl TokenError {
    /// Stable label for structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Expired { .. } => "expired",
            Self::UnknownKey { .. } => "unknown_key",
            Self::InvalidSignature => "invalid_signature",
            Self::Jwks(_) => "upstream_unavailable",
        }
    }
}

/// Error verifying a signed webhook delivery
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header was supplied with the request
    #[error("missing signature header")]
    MissingHeader,

    /// The signature header did not parse into a timestamp and at least one
    /// signature candidate
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// The signed timestamp is outside the replay tolerance window
    #[error("webhook timestamp outside tolerance window")]
    StaleTimestamp {
        /// The timestamp the header carried, Unix seconds
        timestamp: i64,
    },

    /// No signature candidate matched the locally computed HMAC
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// The verified body was not a parseable event envelope
    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl WebhookError {
    /// Stable label for structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader(_) => "malformed_header",
            Self::StaleTimestamp { .. } => "stale_timestamp",
            Self::SignatureMismatch => "signature_mismatch",
            Self::Payload(_) => "invalid_payload",
        }
    }
}
