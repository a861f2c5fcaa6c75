//! HTTP scenario tests for the query connection: pagination, 401 recovery
//! through the real token lifecycle, refresh exhaustion, and plain
//! failures.

use std::sync::Arc;

use async_trait::async_trait;
use orgnav_common::auth::types::TOKEN_CACHE_KEY;
use orgnav_common::auth::AuthError;
use orgnav_common::cache::{CacheOptions, ScopedCache};
use orgnav_common::testing::{MemoryStorage, MockClock, ScriptedFlowHost, StaticFlags};
use orgnav_common::{tenant, AuthConfig, Token, TokenManager, TokenRefresher};
use orgnav_infra::salesforce::{catalog, ApiVersion, Connection, ConnectionError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000_000;

const QUERY_PATH: &str = "/services/data/v62.0/query/";
const TOOLING_PATH: &str = "/services/data/v62.0/tooling/query/";
const TOKEN_PATH: &str = "/services/oauth2/token";

/// Refresher for scenarios where recovery must not produce a credential.
struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh_token(&self, _tenant: &str) -> Result<Option<Token>, AuthError> {
        Ok(None)
    }
}

fn instance_token(instance_url: &str, access_token: &str, refresh: Option<&str>) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: refresh.map(str::to_string),
        instance_url: instance_url.to_string(),
        scope: Some("api refresh_token".to_string()),
        token_type: "Bearer".to_string(),
        id_token: None,
        issued_at: NOW,
    }
}

/// Token manager wired to the same storage the seeded token lives in.
fn lifecycle(storage: &MemoryStorage, clock: &MockClock) -> TokenManager {
    TokenManager::with_clock(
        AuthConfig::new("test_client", "https://ext.example/oauth2"),
        Arc::new(storage.clone()),
        Arc::new(ScriptedFlowHost::redirecting("https://ext.example/oauth2?code=unused")),
        Arc::new(StaticFlags::default()),
        Arc::new(clock.clone()),
    )
}

async fn seed(storage: &MemoryStorage, clock: &MockClock, token: &Token) {
    ScopedCache::with_clock(
        tenant::lightning_hostname(&token.instance_url),
        Arc::new(storage.clone()),
        Arc::new(clock.clone()),
    )
    .set(TOKEN_CACHE_KEY, token, CacheOptions::preserved())
    .await
    .unwrap();
}

/// Pagination: a page with a continuation link followed by one without
/// yields the concatenation of both pages' records, in order.
#[tokio::test]
async fn query_follows_next_records_url_until_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("q", "SELECT Id FROM Account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": false,
            "records": [{"Id": "001A"}, {"Id": "001B"}],
            "nextRecordsUrl": "/services/data/v62.0/query/01g000-2000",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query/01g000-2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": true,
            "records": [{"Id": "001C"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connection =
        Connection::new(server.uri(), "sid", &ApiVersion::default(), Arc::new(NoRefresh));

    let records = connection.query("SELECT Id FROM Account").await.unwrap();

    let ids: Vec<_> = records.iter().map(|r| r["Id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["001A", "001B", "001C"]);
}

/// 401 recovery: the first query response is a 401, the token lifecycle
/// refreshes once, and the same GET is retried with the new bearer. Two
/// calls hit the query endpoint, exactly one hits the token endpoint.
#[tokio::test]
async fn query_recovers_from_401_via_single_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([
            {"errorCode": "INVALID_SESSION_ID", "message": "Session expired or invalid"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", "Bearer B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"Id": "001A"}],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "B",
            "instance_url": server.uri(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let clock = MockClock::new(NOW);
    let token = instance_token(&server.uri(), "A", Some("R"));
    seed(&storage, &clock, &token).await;
    let manager = Arc::new(lifecycle(&storage, &clock));

    let connection = Connection::from_token(&token, &ApiVersion::default(), manager);

    let records = connection.query("SELECT Id FROM Account").await.unwrap();

    assert_eq!(records.len(), 1);
    // The refreshed credential was persisted by the lifecycle, merge
    // carrying the refresh token forward.
    let stored: Token = ScopedCache::with_clock(
        tenant::lightning_hostname(&server.uri()),
        Arc::new(storage.clone()),
        Arc::new(clock.clone()),
    )
    .get(TOKEN_CACHE_KEY)
    .await
    .unwrap()
    .unwrap();
    assert_eq!(stored.access_token, "B");
    assert_eq!(stored.refresh_token.as_deref(), Some("R"));
}

/// When the refresh cannot produce a credential the connection raises the
/// distinguished auth failure with its stable code, so callers can route to
/// an unauthorized state instead of a generic error.
#[tokio::test]
async fn query_reports_auth_refresh_failed_when_refresh_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // No refresh token cached, so the token endpoint must never be called.
    Mock::given(method("POST")).and(path(TOKEN_PATH)).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let storage = MemoryStorage::new();
    let clock = MockClock::new(NOW);
    let token = instance_token(&server.uri(), "A", None);
    seed(&storage, &clock, &token).await;
    let manager = Arc::new(lifecycle(&storage, &clock));

    let connection = Connection::from_token(&token, &ApiVersion::default(), manager);

    let err = connection.query("SELECT Id FROM Account").await.unwrap_err();

    assert!(matches!(err, ConnectionError::AuthRefreshFailed));
    assert_eq!(err.code(), "auth_refresh_failed");
    // The purged credential is gone from storage as well.
    let scope = tenant::lightning_hostname(&server.uri());
    assert!(!storage.contains(&format!("{scope}_{TOKEN_CACHE_KEY}")));
}

/// The retry after a successful refresh happens exactly once: a second 401
/// is a plain HTTP failure, not another refresh cycle.
#[tokio::test]
async fn query_retries_only_once_after_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", "Bearer B"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "B",
            "instance_url": server.uri(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let clock = MockClock::new(NOW);
    let token = instance_token(&server.uri(), "A", Some("R"));
    seed(&storage, &clock, &token).await;
    let manager = Arc::new(lifecycle(&storage, &clock));

    let connection = Connection::from_token(&token, &ApiVersion::default(), manager);

    let err = connection.query("SELECT Id FROM Account").await.unwrap_err();

    assert!(matches!(err, ConnectionError::Http { status: 401, .. }));
}

/// Any other non-success status is surfaced with status and body, and never
/// retried.
#[tokio::test]
async fn non_auth_failures_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let connection =
        Connection::new(server.uri(), "sid", &ApiVersion::default(), Arc::new(NoRefresh));

    let err = connection.query("SELECT Id FROM Account").await.unwrap_err();

    match err {
        ConnectionError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected plain http failure, got {other:?}"),
    }
}

/// Catalog fetches run through the tooling endpoint and deserialize typed
/// rows, ignoring the `attributes` decoration.
#[tokio::test]
async fn entity_definitions_fetch_typed_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOOLING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {
                    "attributes": {"type": "EntityDefinition"},
                    "DurableId": "Account",
                    "KeyPrefix": "001",
                    "Label": "Account",
                    "QualifiedApiName": "Account",
                },
                {
                    "attributes": {"type": "EntityDefinition"},
                    "DurableId": "01I000000000001",
                    "KeyPrefix": "m00",
                    "Label": "Routing Rule",
                    "QualifiedApiName": "Routing_Rule__mdt",
                },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connection =
        Connection::new(server.uri(), "sid", &ApiVersion::default(), Arc::new(NoRefresh));

    let entities = catalog::fetch_entity_definitions(&connection).await.unwrap();

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].qualified_api_name, "Account");
    assert_eq!(entities[1].key_prefix.as_deref(), Some("m00"));
}

/// Setup node fetches embed the requested node types in the SOQL statement.
#[tokio::test]
async fn setup_nodes_fetch_filters_by_node_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOOLING_PATH))
        .and(query_param(
            "q",
            "SELECT FullName, NodeType, Label, Url FROM SetupNode WHERE NodeType IN ('Setup','PersonalSettings')",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "FullName": "ObjectManager",
                "NodeType": "Setup",
                "Label": "Object Manager",
                "Url": "/lightning/setup/ObjectManager/home",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connection =
        Connection::new(server.uri(), "sid", &ApiVersion::default(), Arc::new(NoRefresh));

    let nodes =
        catalog::fetch_setup_nodes(&connection, &["Setup", "PersonalSettings"]).await.unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].label, "Object Manager");
}
