//! Error types for the sync and query paths.

use thiserror::Error;

use crate::store::StoreError;
use sitesearch_repository::EngineError;

/// Errors raised while syncing content into the search index.
///
/// These never block the content mutation that triggered the sync; the
/// caller logs and reports them.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Error from the engine side.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Error reading from the host store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while building a delegated search request.
///
/// Build errors are programming errors: they fail the single query
/// loudly and the caller falls back to native execution.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The request could not be translated into an engine query.
    #[error("failed to build search request: {0}")]
    Build(String),

    /// The requested page lies beyond the engine's maximum result
    /// window; cursor-based paging would be required.
    #[error("pagination depth {requested} exceeds the engine maximum of {max}")]
    PaginationDepth { requested: usize, max: usize },

    /// Error from the engine side.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl QueryError {
    /// Create a build error.
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }
}
