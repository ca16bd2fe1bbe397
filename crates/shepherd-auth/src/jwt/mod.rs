//! Session-token verification
//!
//! The identity provider mints a compact JWS for each signed-in session and
//! publishes its verification keys at a well-known JWKS endpoint. This
//! module is the server-side half of that handshake:
//!
//! - [`jwks`] - fetches and caches the key set (ten-minute TTL)
//! - [`verifier`] - verifies tokens against it, locked to RS256
//!
//! Handlers extract the token from the `Authorization: Bearer` header, call
//! [`TokenVerifier::verify`], and map any error to a generic `401`. The
//! claims object that comes back is theirs to keep.

pub mod jwks;
pub mod verifier;

pub use jwks::JwksCache;
pub use verifier::TokenVerifier;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Claims carried by a verified session token
///
/// Only the fields the product reads are typed. The identity provider
/// embeds more (session id, authorized parties, custom template claims);
/// all of that flows through `additional` untouched and stays available to
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionClaims {
    /// Subject - the user id handlers key their records by
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Email embedded by the identity provider, if the session template
    /// includes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued At - Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Expiration Time - Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Everything else the token carried
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

impl SessionClaims {
    /// The subject id, when the token carries one
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    /// The embedded email, defaulting to empty the way the handlers expect
    #[must_use]
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}
