//! Common test utilities for integration tests
//!
//! A mock identity provider serving a JWKS endpoint, plus RS256 keypairs
//! with the JWK form of their public half for minting test tokens.

#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use once_cell::sync::Lazy;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An RS256 keypair and the JWK form of its public half
pub struct TestKey {
    pub kid: String,
    pub encoding_key: EncodingKey,
    pub jwk: Value,
}

impl TestKey {
    /// Generate a fresh 2048-bit keypair tagged with `kid`
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA key");

        let public_key = private_key.to_public_key();
        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());

        let pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode private key");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("Invalid RSA key");

        Self {
            kid: kid.to_string(),
            encoding_key,
            jwk: json!({
                "kty": "RSA",
                "kid": kid,
                "use": "sig",
                "alg": "RS256",
                "n": n,
                "e": e,
            }),
        }
    }
}

/// Keypair shared across tests - RSA generation is slow enough to do once
pub static SIGNING_KEY: Lazy<TestKey> = Lazy::new(|| TestKey::generate("test-key-1"));

/// A second keypair, for rotation and unknown-kid scenarios
pub static ROTATED_KEY: Lazy<TestKey> = Lazy::new(|| TestKey::generate("test-key-2"));

/// Mint an RS256 token with the given claims, carrying the key's kid
pub fn mint_token(key: &TestKey, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid.clone());
    encode(&header, claims, &key.encoding_key).expect("Failed to encode test JWT")
}

/// Mint a token whose header carries no kid at all
pub fn mint_token_without_kid(key: &TestKey, claims: &Value) -> String {
    let header = Header::new(Algorithm::RS256);
    encode(&header, claims, &key.encoding_key).expect("Failed to encode test JWT")
}

/// Mock identity provider with a `/jwks` endpoint
pub struct MockIdentityProvider {
    pub server: MockServer,
    pub jwks_url: String,
}

impl MockIdentityProvider {
    /// Start a fresh mock provider
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_url = format!("{}/jwks", server.uri());
        Self { server, jwks_url }
    }

    /// Serve the given keys from the JWKS endpoint
    pub async fn mock_jwks(&self, keys: &[&Value]) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Serve the given keys, asserting the endpoint is hit exactly
    /// `expected_fetches` times (verified when the server drops)
    pub async fn mock_jwks_expect(&self, keys: &[&Value], expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(expected_fetches)
            .mount(&self.server)
            .await;
    }

    /// Make the endpoint fail with the given status
    pub async fn mock_jwks_error(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Drop all mounted mocks (and their expectations)
    pub async fn reset(&self) {
        self.server.reset().await;
    }
}

/// Current Unix timestamp, seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}
