//! Authenticated query connection with pagination and 401 recovery.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use orgnav_common::auth::{Token, TokenRefresher};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::ConnectionError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Versioned API identifier, e.g. `62.0`.
#[derive(Debug, Clone)]
pub struct ApiVersion(String);

impl ApiVersion {
    /// Pin a specific API version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self("62.0".to_string())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a query response.
#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    records: Vec<Value>,
    #[serde(rename = "nextRecordsUrl")]
    next_records_url: Option<String>,
}

/// Authenticated session against one tenant's versioned data endpoints.
///
/// The bearer credential sits behind a lock so a mid-query refresh can swap
/// it without tearing down the connection. On a 401 the connection asks the
/// token lifecycle for a refresh exactly once per request attempt and
/// retries the same GET once; every other non-success status is a plain
/// failure.
pub struct Connection {
    instance_url: String,
    base: String,
    tenant: String,
    access_token: RwLock<String>,
    http: Client,
    refresher: Arc<dyn TokenRefresher>,
}

impl Connection {
    /// Create a connection from explicit parts.
    #[must_use]
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        version: &ApiVersion,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let instance_url = instance_url.into().trim_end_matches('/').to_string();
        let base = format!("{instance_url}/services/data/v{version}");
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            tenant: instance_url.clone(),
            instance_url,
            base,
            access_token: RwLock::new(access_token.into()),
            http,
            refresher,
        }
    }

    /// Create a connection for a freshly ensured token.
    #[must_use]
    pub fn from_token(
        token: &Token,
        version: &ApiVersion,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self::new(token.instance_url.clone(), token.access_token.clone(), version, refresher)
    }

    /// Run a SOQL query and return all records, following pagination.
    pub async fn query(&self, soql: &str) -> Result<Vec<Value>, ConnectionError> {
        self.query_loop(format!("{}/query/?q={}", self.base, urlencoding::encode(soql))).await
    }

    /// Run a Tooling API SOQL query.
    pub async fn tooling_query(&self, soql: &str) -> Result<Vec<Value>, ConnectionError> {
        self.query_loop(format!("{}/tooling/query/?q={}", self.base, urlencoding::encode(soql)))
            .await
    }

    async fn query_loop(&self, initial_url: String) -> Result<Vec<Value>, ConnectionError> {
        let mut records = Vec::new();
        let mut next = Some(initial_url);
        while let Some(url) = next {
            let page = self.get_page(&url).await?;
            debug!(count = page.records.len(), "query page received");
            records.extend(page.records);
            // An absent or empty continuation terminates the loop.
            next = page
                .next_records_url
                .filter(|link| !link.is_empty())
                .map(|link| self.resolve_continuation(&link));
        }
        Ok(records)
    }

    /// The platform returns instance-rooted continuation paths; absolute
    /// URLs are followed verbatim.
    fn resolve_continuation(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            format!("{}{}", self.instance_url, next)
        }
    }

    async fn get_page(&self, url: &str) -> Result<QueryPage, ConnectionError> {
        let response = self.send(url).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            info!(tenant = %self.tenant, "query returned 401, refreshing credential");
            match self.refresher.refresh_token(&self.tenant).await? {
                Some(token) => {
                    *self.access_token.write().await = token.access_token;
                    let retried = self.send(url).await?;
                    return Self::read_page(retried).await;
                }
                None => {
                    warn!(tenant = %self.tenant, "credential refresh failed, authorization required");
                    return Err(ConnectionError::AuthRefreshFailed);
                }
            }
        }
        Self::read_page(response).await
    }

    async fn send(&self, url: &str) -> Result<Response, ConnectionError> {
        let bearer = self.access_token.read().await.clone();
        Ok(self
            .http
            .get(url)
            .bearer_auth(bearer)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?)
    }

    async fn read_page(response: Response) -> Result<QueryPage, ConnectionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectionError::Http { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }
}
