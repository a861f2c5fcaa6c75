//! Shared foundation for the OrgNav client core.
//!
//! OrgNav talks to a multi-tenant Salesforce deployment: it authenticates a
//! tenant via OAuth 2.0 + PKCE, keeps the resulting credential fresh, and
//! caches derived data per tenant. This crate carries everything the
//! integration layer builds on:
//!
//! - [`cache`]: tenant-scoped key/value cache over a host-provided storage
//!   backend, with lazy per-entry expiry and preserve-aware bulk clearing
//! - [`auth`]: PKCE generation, the OAuth HTTP client, and the token
//!   lifecycle manager
//! - [`tenant`]: canonical hostname derivation for every platform domain
//!   variant
//! - [`settings`]: the persisted feature flag the auth flows consult
//! - [`time`]: wall-clock abstraction so expiry math is testable
//! - [`testing`]: in-memory fakes shared by unit and integration tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod cache;
pub mod settings;
pub mod tenant;
pub mod testing;
pub mod time;

// Re-export commonly used types for convenience
pub use auth::{
    AuthConfig, AuthError, AuthFlowHost, OAuthClient, PkcePair, Token, TokenManager,
    TokenRefresher, TokenResponse,
};
pub use cache::{CacheEntry, CacheError, CacheOptions, ScopedCache, StorageBackend};
pub use settings::{FeatureFlags, Settings, SettingsStore};
pub use time::{Clock, SystemClock};
