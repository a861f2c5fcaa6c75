//! Auth error taxonomy.

use thiserror::Error;

use crate::cache::CacheError;

/// Error type for authorization and token lifecycle operations.
///
/// OAuth failures keep the raw `error`/`error_description` fields so calling
/// layers can route users (re-prompt, guided install, blocked-state message)
/// without string-matching display output.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Interactive flow closed or denied by the user. Recoverable by
    /// re-prompting.
    #[error("authorization cancelled: {description}")]
    Cancelled {
        /// Raw OAuth error code (or a synthetic one for closed popups).
        error: String,
        /// Raw OAuth error description.
        description: String,
    },

    /// Platform policy rejects the connected app. Not retried
    /// automatically.
    #[error("authorization blocked by admin: {error}: {description}")]
    Blocked { error: String, description: String },

    /// Connected app is not installed in the tenant.
    #[error("connected app not installed: {error}: {description}")]
    AppNotInstalled { error: String, description: String },

    /// Any other OAuth protocol error.
    #[error("oauth error: {error}: {description}")]
    OAuth { error: String, description: String },

    /// Redirect completed without an authorization code.
    #[error("no authorization code in redirect: {redirect}")]
    MissingAuthorizationCode { redirect: String },

    /// Token endpoint rejected the request with a non-OAuth body.
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// Transport-level failure.
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Redirect URL could not be parsed.
    #[error("invalid redirect url: {0}")]
    InvalidRedirect(#[from] url::ParseError),

    /// Token persistence failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl AuthError {
    /// Classify a raw OAuth error response into the taxonomy.
    #[must_use]
    pub fn from_oauth(error: &str, description: Option<&str>) -> Self {
        let error = error.trim().to_string();
        let description = description.unwrap_or_default().to_string();
        let lowered = description.to_lowercase();

        if error == "OAUTH_APP_BLOCKED" || lowered.contains("blocked by admin") {
            return Self::Blocked { error, description };
        }
        if error == "invalid_client" && lowered.contains("app must be installed into org") {
            return Self::AppNotInstalled { error, description };
        }
        if error == "authorization_canceled"
            || error == "access_denied"
            || lowered.contains("user did not approve")
        {
            return Self::Cancelled { error, description };
        }
        Self::OAuth { error, description }
    }

    /// A user-cancelled interactive flow (closed popup, denied consent).
    #[must_use]
    pub fn cancelled(description: impl Into<String>) -> Self {
        Self::Cancelled {
            error: "authorization_canceled".to_string(),
            description: description.into(),
        }
    }

    /// Raw OAuth `error` / `error_description` fields, when present.
    #[must_use]
    pub fn oauth_fields(&self) -> Option<(&str, &str)> {
        match self {
            Self::Cancelled { error, description }
            | Self::Blocked { error, description }
            | Self::AppNotInstalled { error, description }
            | Self::OAuth { error, description } => Some((error, description)),
            _ => None,
        }
    }

    /// True for failures raised by a token endpoint HTTP rejection, i.e. the
    /// cases after which a cached token must be purged rather than served
    /// again.
    pub(crate) fn is_token_endpoint_rejection(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. }
                | Self::Blocked { .. }
                | Self::AppNotInstalled { .. }
                | Self::OAuth { .. }
                | Self::TokenEndpoint { .. }
        )
    }
}
