//! Search engine provider trait definition.
//!
//! This module defines the abstract interface for search engine
//! operations, allowing for different backend implementations
//! (OpenSearch, Elasticsearch, test doubles).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::EngineError;
use crate::types::{BulkSummary, EngineSearchResponse};
use sitesearch_shared::IndexDocument;

/// Abstracts the underlying search engine implementation.
///
/// Implementations are injected into the index manager and the sync/query
/// services, enabling dependency injection and easy testing with mocks.
/// All methods return `Result<T, EngineError>` for consistent error
/// handling across backends.
#[async_trait]
pub trait SearchEngineProvider: Send + Sync {
    /// Probe cluster reachability.
    async fn ping(&self) -> Result<(), EngineError>;

    /// Whether the given index (or alias) exists.
    async fn index_exists(&self, index: &str) -> Result<bool, EngineError>;

    /// Create an index. `body` carries settings, mappings, and any
    /// aliases to attach atomically at creation time.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), EngineError>;

    /// Delete an index. Deleting a missing index is an error.
    async fn delete_index(&self, index: &str) -> Result<(), EngineError>;

    /// Apply a mapping to an existing index. Incompatible changes are
    /// rejected by the engine and surface as `EngineError::Rejected`.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError>;

    /// Read the mapping generation recorded in the index's `_meta`.
    ///
    /// Returns `None` when the index does not exist, `Some(0)` when it
    /// exists but carries no version marker.
    async fn mapping_version(&self, index: &str) -> Result<Option<u32>, EngineError>;

    /// Number of documents currently held by the index.
    async fn count_documents(&self, index: &str) -> Result<u64, EngineError>;

    /// Atomically repoint `alias` from `old_index` (when given) to
    /// `new_index`.
    async fn swap_alias(
        &self,
        alias: &str,
        old_index: Option<&str>,
        new_index: &str,
    ) -> Result<(), EngineError>;

    /// Upsert documents in one bulk request.
    ///
    /// Item-level failures inside an otherwise successful response are
    /// collected into the summary; they never abort the batch.
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, EngineError>;

    /// Delete documents by ID in one bulk request. Missing documents
    /// count as successfully deleted.
    async fn bulk_delete(&self, index: &str, ids: &[u64]) -> Result<BulkSummary, EngineError>;

    /// Execute a search body against one or more indices/aliases.
    async fn search(
        &self,
        indices: &[String],
        body: &Value,
    ) -> Result<EngineSearchResponse, EngineError>;
}
