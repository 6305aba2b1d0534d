//! Host store collaborator interface.
//!
//! The host CMS's storage engine is a black-box source of truth. The
//! engine reads records and related data through this trait and receives
//! typed [`MutationEvent`]s when content changes; it never writes back.

use async_trait::async_trait;
use thiserror::Error;

use sitesearch_shared::{ContentKey, ContentRecord, RelatedData};

/// Error reading from the host store.
#[derive(Debug, Clone, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Read access to the host CMS's content.
///
/// `get_record` returns `Ok(None)` for records that no longer exist;
/// that is a normal outcome (a record can disappear between enqueue and
/// flush), not an error.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the current state of a record.
    async fn get_record(&self, key: &ContentKey) -> Result<Option<ContentRecord>, StoreError>;

    /// Fetch the related data (author, terms, metadata) for a record.
    async fn get_related(&self, key: &ContentKey) -> Result<RelatedData, StoreError>;
}
