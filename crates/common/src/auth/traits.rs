//! Seams between the token lifecycle and its collaborators.
//!
//! The host platform and downstream consumers talk to the lifecycle through
//! small async traits so tests can script them and alternative hosts can
//! plug in their own implementations.

use async_trait::async_trait;

use super::error::AuthError;
use super::types::Token;

/// Host-provided interactive browser round trip.
///
/// Implementations open `auth_url`, let the user complete (or abort) the
/// authorization, and resolve with the full redirect URL. There is no
/// enforced timeout; a closed or cancelled popup must resolve with
/// [`AuthError::Cancelled`], never hang.
#[async_trait]
pub trait AuthFlowHost: Send + Sync {
    /// Run the interactive flow and return the redirect URL it ended on.
    async fn launch_auth_flow(&self, auth_url: &str) -> Result<String, AuthError>;
}

/// Silent-refresh seam consumed by the API connection layer.
///
/// `Ok(None)` means the credential is gone for good (the cached token was
/// purged); the caller must fall back to interactive authorization.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Force-refresh the cached token for `tenant`.
    async fn refresh_token(&self, tenant: &str) -> Result<Option<Token>, AuthError>;
}
