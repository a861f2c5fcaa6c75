//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 so the authorization flow needs no client secret: the
//! token exchange binds the authorization code to a verifier only this
//! client holds.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a cryptographically secure code verifier.
///
/// Returns a URL-safe base64-encoded random string of 32 bytes
/// (43 characters). Per RFC 7636, verifiers must be 43-128 characters long.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate the code challenge for a verifier using SHA-256.
///
/// Per RFC 7636 the challenge is BASE64URL(SHA256(ASCII(code_verifier))):
/// the digest covers the verifier *string*, not the raw random bytes.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// One-shot PKCE verifier/challenge pair.
///
/// Generated fresh per authorization attempt, never persisted, and discarded
/// once the token exchange request completes.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Random string kept secret until the token exchange.
    pub verifier: String,

    /// SHA-256 hash of the verifier, sent in the authorization request.
    pub challenge: String,
}

impl PkcePair {
    /// Generate a new pair from cryptographically secure randomness.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// The challenge method (always "S256").
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
