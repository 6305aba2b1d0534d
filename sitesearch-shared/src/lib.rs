//! # Sitesearch Shared
//!
//! This crate defines the data structures shared across the sitesearch
//! integration engine: content records read from the host store, the
//! denormalized documents written to the search index, native query
//! requests, and the result sets handed back to callers.

pub mod types;

pub use types::content::{
    AuthorData, ContentKey, ContentKind, ContentRecord, MutationAction, MutationEvent, RelatedData,
    TermEntry,
};
pub use types::document::{IndexDocument, MetaEntry};
pub use types::query::{
    AggregationRequest, FieldProjection, MetaClause, MetaCompare, MetaCondition, MetaQuery,
    Pagination, QueryRequest, Relation, SearchField, SortKey, SortOrder, SortSpec, TaxonomyFilter,
    TaxonomyOperator, TermRef,
};
pub use types::result::{ProjectedRecord, ResultHits, ResultSet, SearchRecord};
