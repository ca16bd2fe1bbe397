//! Bearer-token verification
//!
//! Session tokens are compact JWS strings. The verifier is deliberately
//! not a general JWT implementation: only RSA PKCS#1 v1.5 with SHA-256
//! (`RS256`) is accepted, and the header's declared algorithm is never
//! negotiated - a crafted header claiming `none` or an HMAC scheme is
//! still held to RS256. That removes the algorithm-confusion class of
//! attack outright.
//!
//! Check order matters for cost: expiry is decided from the decoded
//! payload before any key lookup, so the common case of a stale token is
//! rejected without crypto work and without a network round trip to
//! refresh the key set.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode, decode_header};
use tracing::{debug, warn};

use super::{JwksCache, SessionClaims};
use crate::config::AuthConfig;
use crate::error::TokenError;

/// Verifier for identity-provider session tokens
///
/// # Example
///
/// ```rust,no_run
/// # use shepherd_auth::{AuthConfig, TokenVerifier};
/// # tokio_test::block_on(async {
/// let config = AuthConfig::new("https://auth.shepherd.chat/.well-known/jwks.json");
/// let verifier = TokenVerifier::from_config(&config);
///
/// let claims = verifier.verify("eyJhbGciOiJSUzI1NiIs...").await?;
/// println!("subject: {:?}", claims.sub);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    /// Key-set cache shared with the rest of the process
    jwks: Arc<JwksCache>,
    /// Leeway applied to the `exp` claim (default: zero)
    clock_leeway: Duration,
}

impl TokenVerifier {
    /// Create a verifier over an existing key-set cache
    ///
    /// Use this when several verifiers (or other components) share one
    /// cache instance.
    pub fn new(jwks: Arc<JwksCache>) -> Self {
        Self {
            jwks,
            clock_leeway: Duration::ZERO,
        }
    }

    /// Create a verifier (and its key-set cache) from deployment
    /// configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            jwks: Arc::new(JwksCache::from_config(config)),
            clock_leeway: config.clock_leeway,
        }
    }

    /// Allow a clock-skew window on the `exp` check
    ///
    /// Zero (the default) keeps strict expiry.
    #[must_use]
    pub fn with_clock_leeway(mut self, leeway: Duration) -> Self {
        self.clock_leeway = leeway;
        self
    }

    /// The key-set cache this verifier reads from
    #[must_use]
    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Verify a session token and return its claims
    ///
    /// Checks run in cost order: structure, expiry, key lookup, signature.
    /// A key-set fetch happens at most once, and only for tokens that are
    /// structurally valid and unexpired.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`] - not three dot-separated segments, or a
    ///   header/payload segment that is not base64url JSON
    /// - [`TokenError::Expired`] - `exp` (plus any configured leeway) is in
    ///   the past
    /// - [`TokenError::UnknownKey`] - no key in the current set matches the
    ///   token's `kid`
    /// - [`TokenError::InvalidSignature`] - RS256 verification over
    ///   `"<header>.<payload>"` failed
    /// - [`TokenError::Jwks`] - the key set could not be fetched
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        }

        let header = decode_header(token)
            .map_err(|e| TokenError::Malformed(format!("invalid token header: {e}")))?;

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| TokenError::Malformed(format!("invalid payload encoding: {e}")))?;
        let claims: SessionClaims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::Malformed(format!("invalid payload JSON: {e}")))?;

        // Expiry before anything that costs: no key lookup and no fetch
        // for a token that is already dead.
        let now = unix_now();
        if let Some(exp) = claims.exp
            && exp.saturating_add(self.clock_leeway.as_secs()) < now
        {
            debug!(exp, now, "token expired");
            return Err(TokenError::Expired { expired_at: exp });
        }

        let keys = self.jwks.get().await?;
        let jwk = header
            .kid
            .as_deref()
            .and_then(|kid| keys.find(kid))
            .ok_or_else(|| {
                warn!(kid = ?header.kid, "no key in the current set matches the token");
                TokenError::UnknownKey {
                    kid: header.kid.clone(),
                }
            })?;

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            warn!(kid = ?header.kid, error = %e, "failed to build verification key from JWK");
            TokenError::InvalidSignature
        })?;

        // Signature over the ASCII "<header>.<payload>", RS256 only. Claim
        // validation is disabled here: expiry was handled above and nothing
        // else is checked at this layer.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let token_data: TokenData<SessionClaims> = decode(token, &decoding_key, &validation)
            .map_err(|e| {
                debug!(error = %e, "token signature verification failed");
                TokenError::InvalidSignature
            })?;

        debug!(sub = ?token_data.claims.sub, "token verified");
        Ok(token_data.claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
