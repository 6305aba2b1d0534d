//! # Sitesearch Repository
//!
//! This crate provides the engine-facing side of the sitesearch
//! integration engine: the [`SearchEngineProvider`] trait, the concrete
//! OpenSearch client facade, per-kind index mappings, the index
//! lifecycle manager, and the engine error taxonomy.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod manager;
pub mod opensearch;
pub mod types;

pub use config::EngineConfig;
pub use errors::EngineError;
pub use interfaces::SearchEngineProvider;
pub use manager::{IndexDescriptor, IndexManager};
pub use opensearch::OpenSearchProvider;
pub use types::{BulkItemFailure, BulkSummary, EngineHit, EngineSearchResponse};
