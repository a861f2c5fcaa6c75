//! Typed Tooling API queries backing the command catalog.
//!
//! The surrounding product resolves its navigation command list from these
//! records. The fetches live here so every call site shares the pagination
//! and 401-recovery behavior of [`Connection`]; command construction and
//! dedup stay with the caller.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::connection::Connection;
use super::error::ConnectionError;

/// Setup tree node (Tooling API `SetupNode`).
#[derive(Debug, Clone, Deserialize)]
pub struct SetupNode {
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "NodeType")]
    pub node_type: String,
    #[serde(rename = "Label")]
    pub label: String,
    /// Absent for grouping nodes that are not navigable themselves.
    #[serde(rename = "Url", default)]
    pub url: Option<String>,
}

/// Customizable object or custom metadata type (`EntityDefinition`).
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDefinition {
    #[serde(rename = "DurableId")]
    pub durable_id: String,
    #[serde(rename = "KeyPrefix", default)]
    pub key_prefix: Option<String>,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "QualifiedApiName")]
    pub qualified_api_name: String,
}

/// Flow definition with its version pointers (`FlowDefinition`).
#[derive(Debug, Clone, Deserialize)]
pub struct FlowDefinition {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ActiveVersionId", default)]
    pub active_version_id: Option<String>,
    #[serde(rename = "LatestVersionId", default)]
    pub latest_version_id: Option<String>,
    #[serde(rename = "LatestVersion", default)]
    pub latest_version: Option<FlowVersion>,
}

/// Version metadata nested under a flow definition.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowVersion {
    #[serde(rename = "MasterLabel")]
    pub master_label: String,
}

/// Fetch setup menu nodes for the given node types.
pub async fn fetch_setup_nodes(
    connection: &Connection,
    node_types: &[&str],
) -> Result<Vec<SetupNode>, ConnectionError> {
    let soql = format!(
        "SELECT FullName, NodeType, Label, Url FROM SetupNode WHERE NodeType IN ('{}')",
        node_types.join("','")
    );
    let rows = connection.tooling_query(&soql).await?;
    Ok(parse_rows(rows))
}

/// Fetch customizable entity definitions (sObjects and custom metadata).
pub async fn fetch_entity_definitions(
    connection: &Connection,
) -> Result<Vec<EntityDefinition>, ConnectionError> {
    let soql = "SELECT DurableId, KeyPrefix, Label, QualifiedApiName \
                FROM EntityDefinition \
                WHERE IsCustomizable = TRUE AND IsCustomSetting = FALSE \
                ORDER BY QualifiedApiName";
    let rows = connection.tooling_query(soql).await?;
    Ok(parse_rows(rows))
}

/// Fetch flow definitions with their version labels.
pub async fn fetch_flow_definitions(
    connection: &Connection,
) -> Result<Vec<FlowDefinition>, ConnectionError> {
    let soql =
        "SELECT ActiveVersionId, Id, LatestVersionId, LatestVersion.MasterLabel FROM FlowDefinition";
    let rows = connection.tooling_query(soql).await?;
    Ok(parse_rows(rows))
}

/// Deserialize query rows, skipping any that do not match the expected
/// shape (the API decorates rows with `attributes` and may add fields).
fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!(%err, "skipping row that does not match expected shape");
                None
            }
        })
        .collect()
}
