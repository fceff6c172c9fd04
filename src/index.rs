//! Idempotent bulk upsert of review documents into the search index.
//!
//! Each document becomes one update-or-insert action keyed by `id_review`:
//! an existing document gets every field overwritten plus a fresh
//! `updated_at`, while a new one is inserted with `created_at` as well.
//! Re-loading the same documents therefore never touches `created_at` and
//! never duplicates a document.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::config::IndexConfig;
use crate::error::{EtlError, Result};
use crate::metrics::PipelineMetrics;
use crate::models::ReviewDocument;
use crate::schema;

/// Timestamp format of `created_at` / `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One update-or-insert action
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertAction {
    /// Document id in the index
    pub id: String,
    /// Fields applied when the document exists
    pub doc: Map<String, Value>,
    /// Full document inserted when it does not
    pub upsert: Map<String, Value>,
}

/// Per-document result of a bulk submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    /// Document id
    pub id: Option<String>,
    /// HTTP-like status of the item
    pub status: u16,
    /// Error reported for the item, if any
    pub error: Option<String>,
}

impl BulkItemResult {
    /// Whether the item was applied
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// A document that could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Document id, when known
    pub id: Option<String>,
    /// Why it was rejected
    pub reason: String,
}

/// Outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Actions submitted in the bulk request
    pub submitted: usize,
    /// Documents inserted or updated
    pub succeeded: usize,
    /// Documents dropped for lack of an id
    pub skipped: usize,
    /// Documents rejected before or during the bulk request
    pub failed: Vec<DocumentFailure>,
}

/// Actions ready for submission
#[derive(Debug, Default)]
pub struct PreparedActions {
    /// Valid actions
    pub actions: Vec<UpsertAction>,
    /// Documents without an id
    pub skipped: usize,
    /// Documents rejected by the schema allow-list
    pub rejected: Vec<DocumentFailure>,
}

/// Search index operations used by the loader
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Check that the index service answers
    async fn ping(&self) -> Result<()>;

    /// Create `name` with `mapping` unless it already exists
    async fn ensure_index(&self, name: &str, mapping: &Value) -> Result<()>;

    /// Submit all actions in one bulk request
    async fn bulk_upsert(&self, name: &str, actions: &[UpsertAction]) -> Result<Vec<BulkItemResult>>;
}

/// Render a load timestamp
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

fn document_id(document: &ReviewDocument) -> Option<&str> {
    document
        .id_review
        .as_deref()
        .filter(|id| !id.trim().is_empty())
}

/// Build one upsert action from an already serialized document
///
/// Fails with [`EtlError::SchemaViolation`] when `doc` carries a field the
/// index mapping does not declare.
pub fn upsert_action(id: &str, mut doc: Map<String, Value>, now: DateTime<Utc>) -> Result<UpsertAction> {
    schema::validate_fields(&doc)?;

    let timestamp = Value::String(format_timestamp(now));
    doc.insert("updated_at".to_string(), timestamp.clone());
    let mut upsert = doc.clone();
    upsert.insert("created_at".to_string(), timestamp);

    Ok(UpsertAction {
        id: id.to_string(),
        doc,
        upsert,
    })
}

/// Turn documents into upsert actions stamped with `now`
pub fn build_actions(documents: &[ReviewDocument], now: DateTime<Utc>) -> Result<PreparedActions> {
    let mut prepared = PreparedActions::default();

    for document in documents {
        let Some(id) = document_id(document) else {
            warn!("Skipping document without id_review");
            prepared.skipped += 1;
            continue;
        };

        let Value::Object(doc) = serde_json::to_value(document)? else {
            return Err(EtlError::SchemaViolation(format!(
                "document {id} is not a JSON object"
            )));
        };

        // Rejects any field the mapping does not declare
        match upsert_action(id, doc, now) {
            Ok(action) => prepared.actions.push(action),
            Err(e) => {
                warn!(id, error = %e, "Document rejected by schema");
                prepared.rejected.push(DocumentFailure {
                    id: Some(id.to_string()),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(prepared)
}

/// Load documents, stamping them with the current time
pub async fn load_documents(
    index: &dyn DocumentIndex,
    index_name: &str,
    documents: &[ReviewDocument],
) -> Result<LoadReport> {
    load_documents_at(index, index_name, documents, Utc::now()).await
}

/// Load documents, stamping them with `now`
///
/// Fails on an unreachable index or a failed bulk request. Documents
/// rejected individually are listed in the report and logged as a warning.
pub async fn load_documents_at(
    index: &dyn DocumentIndex,
    index_name: &str,
    documents: &[ReviewDocument],
    now: DateTime<Utc>,
) -> Result<LoadReport> {
    if let Err(e) = index.ping().await {
        error!(error = %e, "Document index unreachable");
        return Err(match e {
            EtlError::Connection(_) => e,
            other => EtlError::Connection(other.to_string()),
        });
    }

    index.ensure_index(index_name, &schema::mapping()).await?;

    if documents.is_empty() {
        warn!(index = index_name, "No document to load");
        return Ok(LoadReport::default());
    }

    let prepared = build_actions(documents, now)?;
    let mut report = LoadReport {
        submitted: prepared.actions.len(),
        skipped: prepared.skipped,
        failed: prepared.rejected,
        ..LoadReport::default()
    };

    if !prepared.actions.is_empty() {
        let items = index.bulk_upsert(index_name, &prepared.actions).await?;
        for item in items {
            if item.is_success() {
                report.succeeded += 1;
            } else {
                report.failed.push(DocumentFailure {
                    id: item.id,
                    reason: item.error.unwrap_or_else(|| format!("status {}", item.status)),
                });
            }
        }
    }

    PipelineMetrics::default().record_load(report.succeeded, report.failed.len());
    info!(
        index = index_name,
        succeeded = report.succeeded,
        skipped = report.skipped,
        "Documents inserted or updated"
    );

    if !report.failed.is_empty() {
        let summary = EtlError::BulkPartial {
            failed: report.failed.len(),
            submitted: documents.len() - report.skipped,
        };
        warn!(index = index_name, failures = ?report.failed, "{summary}");
    }

    Ok(report)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkResponseItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

/// Elasticsearch REST client
pub struct ElasticsearchIndex {
    client: Client,
    host: String,
}

impl ElasticsearchIndex {
    /// Create a client for `host` with a per-request `timeout`
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the `index` configuration section
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        Self::new(&config.host, Duration::from_secs(config.timeout_secs))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.host)
    }

    /// Render actions as a bulk NDJSON body
    #[must_use]
    pub fn bulk_body(index_name: &str, actions: &[UpsertAction]) -> String {
        let mut body = String::new();
        for action in actions {
            let header = json!({"update": {"_index": index_name, "_id": action.id}});
            let payload = json!({"doc": action.doc, "upsert": action.upsert});
            body.push_str(&header.to_string());
            body.push('\n');
            body.push_str(&payload.to_string());
            body.push('\n');
        }
        body
    }
}

#[async_trait]
impl DocumentIndex for ElasticsearchIndex {
    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .head(self.url(""))
            .send()
            .await
            .map_err(|e| EtlError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EtlError::Connection(format!("ping returned {}", response.status())))
        }
    }

    async fn ensure_index(&self, name: &str, mapping: &Value) -> Result<()> {
        let exists = self.client.head(self.url(name)).send().await?;
        if exists.status().is_success() {
            info!(index = name, "Index already exists");
            return Ok(());
        }
        if exists.status() != StatusCode::NOT_FOUND {
            return Err(EtlError::Connection(format!(
                "index check returned {}",
                exists.status()
            )));
        }

        let response = self
            .client
            .put(self.url(name))
            .json(&json!({"mappings": mapping}))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            info!(index = name, "Index created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            info!(index = name, "Index created concurrently");
            return Ok(());
        }

        Err(EtlError::Connection(format!(
            "index creation returned {status}: {body}"
        )))
    }

    async fn bulk_upsert(&self, name: &str, actions: &[UpsertAction]) -> Result<Vec<BulkItemResult>> {
        let response = self
            .client
            .post(self.url("_bulk"))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(Self::bulk_body(name, actions))
            .send()
            .await?
            .error_for_status()?;

        let parsed: BulkResponse = response.json().await?;
        if parsed.errors {
            warn!(index = name, "Bulk response reports item errors");
        }

        Ok(parsed
            .items
            .into_iter()
            .filter_map(|mut item| item.remove("update"))
            .map(|item| BulkItemResult {
                id: item.id,
                status: item.status,
                error: item.error.map(|e| e.to_string()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_body_is_ndjson_pairs() {
        let mut doc = Map::new();
        doc.insert("id_review".to_string(), json!("r1"));
        let action = UpsertAction {
            id: "r1".to_string(),
            doc: doc.clone(),
            upsert: doc,
        };
        let body = ElasticsearchIndex::bulk_body("reviews", &[action]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let header: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["update"]["_id"], "r1");
        assert_eq!(header["update"]["_index"], "reviews");
        let payload: Value = serde_json::from_str(lines[1]).unwrap();
        assert!(payload.get("doc").is_some());
        assert!(payload.get("upsert").is_some());
    }

    #[test]
    fn test_bulk_item_success() {
        let ok = BulkItemResult { id: None, status: 201, error: None };
        let bad = BulkItemResult { id: None, status: 400, error: Some("mapping".to_string()) };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
