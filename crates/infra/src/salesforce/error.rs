//! Connection error taxonomy.

use orgnav_common::auth::AuthError;
use thiserror::Error;

/// Stable code callers use to route to an "unauthorized" UI state instead of
/// a generic error surface.
pub const AUTH_REFRESH_FAILED_CODE: &str = "auth_refresh_failed";

/// Error type for query connection operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A 401 was received and the silent refresh could not produce a new
    /// credential. Callers should fall back to interactive authorization.
    #[error("authentication refresh failed")]
    AuthRefreshFailed,

    /// Non-success response from the data endpoint. Not retried.
    #[error("query endpoint returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure.
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failure raised by the token lifecycle during 401 recovery.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ConnectionError {
    /// Stable machine-readable code for caller-side routing.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRefreshFailed => AUTH_REFRESH_FAILED_CODE,
            Self::Http { .. } => "http_error",
            Self::Request(_) => "network_error",
            Self::Auth(_) => "auth_error",
        }
    }
}
