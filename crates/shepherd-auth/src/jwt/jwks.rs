//! JSON Web Key Set fetching and caching
//!
//! The identity provider rotates its signing keys, so verification keys are
//! fetched from the well-known JWKS endpoint rather than pinned. Fetches
//! are memoized for ten minutes: long enough to keep the provider off the
//! hot path, short enough that a rotation propagates quickly.
//!
//! Cache semantics:
//!
//! - the entry is replaced wholesale on refresh, never mutated field by
//!   field
//! - a failed refresh leaves the previous entry in place untouched; by
//!   default the failure propagates to the in-flight verification, but
//!   deployments can opt into serving the stale set instead
//! - concurrent refreshes are tolerated - both writers store an equivalent
//!   set and last-write-wins

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::jwk::JwkSet;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::JwksError;

/// Default cache TTL: 10 minutes
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Minimum interval between forced refreshes
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout on key-set fetches
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched key set plus the moment it was fetched
#[derive(Debug, Clone)]
struct CachedKeys {
    keys: JwkSet,
    fetched_at: SystemTime,
    ttl: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        match SystemTime::now().duration_since(self.fetched_at) {
            Ok(age) => age < self.ttl,
            Err(_) => false, // clock went backwards, treat as expired
        }
    }
}

/// TTL-memoized fetcher for the identity provider's key set
///
/// Cloning is cheap and clones share the same cache, so one instance per
/// process is the intended shape.
///
/// # Example
///
/// ```rust,no_run
/// # use shepherd_auth::jwt::JwksCache;
/// # tokio_test::block_on(async {
/// let cache = JwksCache::new("https://auth.shepherd.chat/.well-known/jwks.json".to_string());
///
/// let keys = cache.get().await?;
/// if let Some(key) = keys.find("ins_2abc") {
///     // key is ready for signature verification
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct JwksCache {
    /// JWKS endpoint URL
    jwks_url: String,
    /// Cached key set
    cache: Arc<RwLock<Option<CachedKeys>>>,
    /// HTTP client
    http_client: reqwest::Client,
    /// Cache TTL
    cache_ttl: Duration,
    /// Serve the previous set when a refresh fails
    serve_stale_on_error: bool,
    /// Last outbound fetch, for refresh rate limiting
    last_fetch: Arc<RwLock<Option<SystemTime>>>,
}

impl JwksCache {
    /// Create a cache with default settings (10 minute TTL, 10 second fetch
    /// timeout, no stale serving)
    pub fn new(jwks_url: String) -> Self {
        Self::build(jwks_url, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, false)
    }

    /// Create a cache with a custom TTL
    ///
    /// Shorter TTLs pick up key rotations faster at the cost of more
    /// traffic to the provider.
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        Self::build(jwks_url, cache_ttl, DEFAULT_FETCH_TIMEOUT, false)
    }

    /// Create a cache from deployment configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::build(
            config.jwks_url.clone(),
            config.cache_ttl,
            config.fetch_timeout,
            config.serve_stale_on_error,
        )
    }

    fn build(
        jwks_url: String,
        cache_ttl: Duration,
        fetch_timeout: Duration,
        serve_stale_on_error: bool,
    ) -> Self {
        Self {
            jwks_url,
            cache: Arc::new(RwLock::new(None)),
            http_client: reqwest::Client::builder()
                .timeout(fetch_timeout)
                .build()
                .expect("Failed to create HTTP client"),
            cache_ttl,
            serve_stale_on_error,
            last_fetch: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the key set, from cache or by fetching
    ///
    /// Returns the cached set unconditionally while it is fresh; otherwise
    /// fetches, atomically replaces the cache, and returns the new set.
    ///
    /// # Errors
    ///
    /// Returns [`JwksError`] if the endpoint is unreachable, answers with a
    /// non-success status, or returns a body that is not a key-set
    /// document - unless stale serving is enabled and a previous set
    /// exists.
    pub async fn get(&self) -> Result<JwkSet, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.is_fresh()
            {
                debug!(jwks_url = %self.jwks_url, "using cached key set");
                return Ok(cached.keys.clone());
            }
        }

        match self.fetch_and_replace().await {
            Ok(keys) => Ok(keys),
            Err(err) if self.serve_stale_on_error => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    Some(cached) => {
                        warn!(
                            jwks_url = %self.jwks_url,
                            error = %err,
                            "key-set refresh failed, serving stale entry"
                        );
                        Ok(cached.keys.clone())
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Force a refresh, ignoring the TTL
    ///
    /// Intended for key-rotation recovery after a verification failure.
    /// Rate limited: inside the minimum interval this degrades to [`get`],
    /// so a burst of failing tokens cannot hammer the provider.
    ///
    /// [`get`]: JwksCache::get
    ///
    /// # Errors
    ///
    /// Returns [`JwksError`] when the fetch fails; the previous cache entry
    /// is left in place.
    pub async fn refresh(&self) -> Result<JwkSet, JwksError> {
        {
            let last_fetch = self.last_fetch.read().await;
            if let Some(last) = *last_fetch
                && let Ok(since_last) = SystemTime::now().duration_since(last)
                && since_last < MIN_REFRESH_INTERVAL
            {
                warn!(
                    jwks_url = %self.jwks_url,
                    since_last_ms = since_last.as_millis(),
                    "key-set refresh rate limited, using cache"
                );
                return self.get().await;
            }
        }

        self.fetch_and_replace().await
    }

    /// Fetch the key set and replace the cache entry wholesale
    async fn fetch_and_replace(&self) -> Result<JwkSet, JwksError> {
        info!(jwks_url = %self.jwks_url, "fetching key set");

        let response = self.http_client.get(&self.jwks_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                jwks_url = %self.jwks_url,
                status = %status,
                "key-set endpoint returned error status"
            );
            return Err(JwksError::Status(status));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| JwksError::Decode(e.to_string()))?;

        debug!(
            jwks_url = %self.jwks_url,
            key_count = keys.keys.len(),
            "key set fetched"
        );

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedKeys {
                keys: keys.clone(),
                fetched_at: SystemTime::now(),
                ttl: self.cache_ttl,
            });
        }
        {
            let mut last_fetch = self.last_fetch.write().await;
            *last_fetch = Some(SystemTime::now());
        }

        Ok(keys)
    }

    /// The configured JWKS endpoint
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Drop the cached key set, forcing the next `get` to fetch
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        debug!(jwks_url = %self.jwks_url, "key-set cache cleared");
    }
}
