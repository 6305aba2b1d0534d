//! Wire types for the engine's documented JSON surface, plus the bulk
//! operation summary handed back to callers.

use serde::Deserialize;
use serde_json::Value;

/// Total hit count envelope from a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default)]
    pub relation: String,
}

/// A single hit from a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub highlight: Option<Value>,
}

/// The hits envelope of a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<EngineHit>,
}

/// A search response as the engine returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSearchResponse {
    #[serde(default)]
    pub took: u64,
    pub hits: HitsEnvelope,
    #[serde(default)]
    pub aggregations: Option<Value>,
}

/// Per-item status inside a bulk response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemStatus {
    /// Human-readable reason for an item-level failure, if any.
    pub fn error_reason(&self) -> Option<String> {
        self.error.as_ref().map(|e| {
            e.get("reason")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string())
        })
    }
}

/// One element of a bulk response's `items` array. The engine wraps each
/// status in the action name it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponseItem {
    #[serde(default)]
    pub index: Option<BulkItemStatus>,
    #[serde(default)]
    pub delete: Option<BulkItemStatus>,
}

impl BulkResponseItem {
    /// The item status regardless of action type.
    pub fn status(&self) -> Option<&BulkItemStatus> {
        self.index.as_ref().or(self.delete.as_ref())
    }

    /// Whether this item was a delete action.
    pub fn is_delete(&self) -> bool {
        self.delete.is_some()
    }
}

/// A bulk response as the engine returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkResponseItem>,
}

/// An item-level failure inside an otherwise successful bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    /// The document `_id` as reported by the engine.
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Outcome of a bulk request: item-level failures never abort the batch,
/// they are collected here for the caller to act on.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// Summarize a wire-level bulk response. A 404 on a delete action
    /// counts as success: the document is gone either way.
    pub fn from_response(response: &BulkResponse) -> Self {
        let mut failures = Vec::new();
        let mut total = 0;

        for item in &response.items {
            let Some(status) = item.status() else {
                continue;
            };
            total += 1;
            let not_found_delete = item.is_delete() && status.status == 404;
            if status.status >= 400 && !not_found_delete {
                failures.push(BulkItemFailure {
                    id: status.id.clone(),
                    status: status.status,
                    reason: status
                        .error_reason()
                        .unwrap_or_else(|| format!("item failed with status {}", status.status)),
                });
            }
        }

        Self {
            total,
            succeeded: total - failures.len(),
            failed: failures.len(),
            failures,
        }
    }

    /// The `_id`s of failed items.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }
}
