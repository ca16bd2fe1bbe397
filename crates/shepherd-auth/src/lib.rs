//! # Shepherd Auth - Signed-Credential Verification
//!
//! Verification core for the Shepherd voice assistant backend. Every
//! authenticated API request carries a session token minted by the identity
//! provider, and every billing webhook carries a signature header from the
//! billing provider; this crate is the single place where both are checked
//! before any handler touches user data or parses a billing event.
//!
//! ## What this crate verifies
//!
//! - **Session tokens** - compact JWS strings, verified against the identity
//!   provider's published key set (JWKS). The key set is fetched from the
//!   well-known endpoint and cached for ten minutes. Only RSA-SHA256
//!   (`RS256`) tokens are accepted; the header's declared algorithm is
//!   deliberately never negotiated.
//! - **Billing webhooks** - raw request bodies signed with a shared secret.
//!   The `stripe-signature`-style header carries a Unix timestamp and one or
//!   more HMAC-SHA256 candidates; deliveries outside a five-minute replay
//!   window are rejected before any comparison happens.
//!
//! Both verifiers are stateless per request. The only shared mutable state
//! is the in-process key-set cache, which is safe to share across concurrent
//! requests and is replaced wholesale on refresh.
//!
//! ## Architecture
//!
//! - [`jwt`] - session-token verification
//!   - `jwks` - key-set fetching and caching
//!   - `verifier` - token verification (fixed RS256)
//! - [`webhook`] - billing-webhook signature verification and the typed
//!   event envelope
//! - [`config`] - runtime configuration with production defaults
//! - [`error`] - per-component error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shepherd_auth::{AuthConfig, TokenVerifier, WebhookVerifier};
//!
//! # tokio_test::block_on(async {
//! let config = AuthConfig::new("https://auth.shepherd.chat/.well-known/jwks.json");
//! let tokens = TokenVerifier::from_config(&config);
//!
//! // Handlers call this before touching any user data.
//! let claims = tokens.verify("eyJhbGciOiJSUzI1NiIs...").await?;
//! println!("authenticated {}", claims.sub.as_deref().unwrap_or("<unknown>"));
//!
//! // The webhook route verifies the raw body before parsing it.
//! let webhooks = WebhookVerifier::new(std::env::var("BILLING_WEBHOOK_SECRET").unwrap());
//! let event = webhooks.verify_and_parse(b"{...}", Some("t=...,v1=..."))?;
//! println!("billing event: {}", event.event_type);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```
//!
//! ## Error handling at the HTTP boundary
//!
//! Every error is terminal for the request being served. Handlers must map
//! any [`error::TokenError`] to a generic `401 Unauthorized` and any
//! [`error::WebhookError`] to a generic `400 Bad Request` - the specific
//! failure (expired vs. bad signature vs. unknown key) must not be exposed
//! to the caller. Use the `kind()` accessors for internal diagnostics.

pub mod config;
pub mod error;
pub mod jwt;
pub mod webhook;

// Re-export the types handlers actually touch
pub use config::AuthConfig;
pub use error::{JwksError, TokenError, WebhookError};
pub use jwt::{JwksCache, SessionClaims, TokenVerifier};
pub use webhook::{BillingEvent, WebhookVerifier};
