//! Runtime configuration for the verification core
//!
//! Defaults mirror the production deployment: a ten-minute key-set cache,
//! strict token expiry (no leeway), and a five-minute webhook replay window.
//! Everything here is tunable policy; the verification semantics themselves
//! are not configurable.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for token and webhook verification
///
/// Construct with [`AuthConfig::new`] and adjust with the `with_*` builders,
/// or deserialize it from the deployment's config layer - every field except
/// `jwks_url` has a serde default.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWKS endpoint of the identity provider
    pub jwks_url: String,

    /// How long a fetched key set stays valid (default: 10 minutes)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,

    /// Leeway applied to the `exp` claim when verifying tokens
    ///
    /// Zero keeps expiry strict; deployments that see clock drift between
    /// the identity provider and this process can allow a small window
    /// (60 seconds is typical).
    #[serde(default)]
    pub clock_leeway: Duration,

    /// Timeout on key-set fetches (default: 10 seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,

    /// Serve the previously fetched key set when a refresh fails, instead of
    /// failing the in-flight verification (default: off)
    #[serde(default)]
    pub serve_stale_on_error: bool,

    /// Maximum age difference accepted for webhook timestamps
    /// (default: 5 minutes)
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance: Duration,
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_webhook_tolerance() -> Duration {
    Duration::from_secs(300)
}

impl AuthConfig {
    /// Configuration with production defaults for the given JWKS endpoint
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: default_cache_ttl(),
            clock_leeway: Duration::ZERO,
            fetch_timeout: default_fetch_timeout(),
            serve_stale_on_error: false,
            webhook_tolerance: default_webhook_tolerance(),
        }
    }

    /// Adjust how long a fetched key set stays valid
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Allow a clock-skew window on token expiry
    #[must_use]
    pub fn with_clock_leeway(mut self, leeway: Duration) -> Self {
        self.clock_leeway = leeway;
        self
    }

    /// Adjust the key-set fetch timeout
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Serve a stale key set when a refresh fails rather than erroring
    #[must_use]
    pub fn with_serve_stale_on_error(mut self, serve_stale: bool) -> Self {
        self.serve_stale_on_error = serve_stale;
        self
    }

    /// Adjust the webhook replay tolerance window
    #[must_use]
    pub fn with_webhook_tolerance(mut self, tolerance: Duration) -> Self {
        self.webhook_tolerance = tolerance;
        self
    }
}
