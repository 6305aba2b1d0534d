//! Result set types returned to native query callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::IndexDocument;

/// A full record-shaped search result.
///
/// `from_search` marks the result as served from the search engine, so
/// consumers know not to re-query the source store for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRecord {
    pub document: IndexDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, Vec<String>>,
    pub from_search: bool,
}

/// A lightweight projection carrying only the requested fields plus the
/// record ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectedRecord {
    pub id: u64,
    pub fields: BTreeMap<String, Value>,
}

/// The hits of a result set, shaped by the caller's field projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ResultHits {
    Records(Vec<SearchRecord>),
    Ids(Vec<u64>),
    Projections(Vec<ProjectedRecord>),
}

impl ResultHits {
    pub fn len(&self) -> usize {
        match self {
            ResultHits::Records(r) => r.len(),
            ResultHits::Ids(r) => r.len(),
            ResultHits::Projections(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered result page plus the engine's total match count.
///
/// `total` always reflects the engine-reported total, never the page
/// size, so `total >= hits.len()` holds for every response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    pub hits: ResultHits,
    pub total: u64,
    pub took_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

impl ResultSet {
    /// An empty full-projection result set.
    pub fn empty() -> Self {
        Self {
            hits: ResultHits::Records(Vec::new()),
            total: 0,
            took_ms: 0,
            aggregations: None,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
