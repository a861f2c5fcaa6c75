//! OAuth 2.0 + PKCE authentication for multi-tenant Salesforce access.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │  TokenManager  │  Lifecycle: ensure / silent refresh / renegotiate
//! └───────┬────────┘
//!         ├──► OAuthClient      (authorize URL, code exchange, refresh grant)
//!         ├──► AuthFlowHost     (host-driven interactive browser round trip)
//!         ├──► ScopedCache      (token persistence, keyed by canonical tenant)
//!         └──► PkcePair         (per-attempt verifier/challenge)
//! ```
//!
//! A caller asks [`TokenManager`] for a usable token; it answers with the
//! cached token, a silently refreshed one, or `None` when interactive
//! authorization is required. The API connection layer consumes
//! [`TokenRefresher`] to recover from authorization failures mid-query.

pub mod client;
pub mod error;
pub mod pkce;
pub mod token_manager;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use client::OAuthClient;
pub use error::AuthError;
pub use pkce::{generate_code_challenge, generate_code_verifier, PkcePair};
pub use token_manager::TokenManager;
pub use traits::{AuthFlowHost, TokenRefresher};
pub use types::{AuthConfig, OAuthErrorResponse, Token, TokenResponse};
