//! OAuth 2.0 HTTP client: authorization URL, code exchange, refresh grant.
//!
//! Protocol round trips only. Lifecycle policy (expiry math, persistence,
//! scope renegotiation) lives in [`super::token_manager`].

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::error::AuthError;
use super::pkce::PkcePair;
use super::types::{AuthConfig, OAuthErrorResponse, TokenResponse};

/// Authorization endpoint path on the Lightning host.
const AUTHORIZE_PATH: &str = "/services/oauth2/authorize";

/// Token endpoint path on the core host / instance.
const TOKEN_PATH: &str = "/services/oauth2/token";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth 2.0 + PKCE protocol client for one deployment configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: AuthConfig,
    http: Client,
}

impl OAuthClient {
    /// Create a client with the given configuration.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, http }
    }

    /// Access the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the browser authorization URL for `tenant`.
    #[must_use]
    pub fn authorization_url(&self, tenant: &str, scopes: &str, pkce: &PkcePair) -> String {
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scopes),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", pkce.challenge_method()),
        ];
        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{AUTHORIZE_PATH}?{query}", self.config.authorize_base(tenant))
    }

    /// Extract the authorization code from the redirect callback URL.
    ///
    /// A missing code, or an `error` query parameter, is a terminal failure
    /// carrying the raw OAuth fields for the caller to classify.
    pub fn parse_callback(redirect_url: &str) -> Result<String, AuthError> {
        let url = Url::parse(redirect_url)?;
        let mut code = None;
        let mut error = None;
        let mut error_description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        if let Some(error) = error {
            warn!(%error, "authorization redirect returned an error");
            return Err(AuthError::from_oauth(&error, error_description.as_deref()));
        }
        code.ok_or_else(|| AuthError::MissingAuthorizationCode {
            redirect: redirect_url.to_string(),
        })
    }

    /// Exchange an authorization code (plus PKCE verifier) for tokens.
    pub async fn exchange_code(
        &self,
        tenant: &str,
        code: &str,
        verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let endpoint = format!("{}{TOKEN_PATH}", self.config.token_base(tenant));
        debug!(%tenant, "exchanging authorization code");
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ];
        self.post_token(&endpoint, &form).await
    }

    /// Request a fresh access token via the refresh grant.
    ///
    /// The endpoint derives from the issuing instance URL, not the tenant
    /// hostname, so refreshes land on the instance that minted the token.
    pub async fn refresh_grant(
        &self,
        instance_url: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        let endpoint = format!("{}{TOKEN_PATH}", instance_url.trim_end_matches('/'));
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.post_token(&endpoint, &form).await
    }

    async fn post_token(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self.http.post(endpoint).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(oauth) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(AuthError::from_oauth(&oauth.error, oauth.error_description.as_deref()));
            }
            return Err(AuthError::TokenEndpoint { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }
}
