//! Result mapper.
//!
//! Converts an engine search response back into the shape the native
//! query caller expects. Engine-returned order is preserved exactly (no
//! native re-sort), and the total always comes from the engine's
//! reported total hits, independent of page size.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use sitesearch_repository::types::{EngineHit, EngineSearchResponse};
use sitesearch_shared::{
    FieldProjection, IndexDocument, ProjectedRecord, ResultHits, ResultSet, SearchRecord,
};

/// Maps engine responses to native-shaped result sets.
pub struct ResultMapper;

impl ResultMapper {
    pub fn new() -> Self {
        Self
    }

    /// Map a response under the caller's original field projection.
    ///
    /// Hits whose source cannot be interpreted are skipped with a
    /// warning; one malformed hit never fails the whole response.
    pub fn map(&self, response: EngineSearchResponse, projection: &FieldProjection) -> ResultSet {
        let total = response.hits.total.value;
        let took_ms = response.took;

        let hits = match projection {
            FieldProjection::Full => {
                let mut records = Vec::with_capacity(response.hits.hits.len());
                for hit in response.hits.hits {
                    match Self::full_record(hit) {
                        Some(record) => records.push(record),
                        None => warn!("Dropping hit with undecodable source"),
                    }
                }
                ResultHits::Records(records)
            }
            FieldProjection::Ids => {
                let mut ids = Vec::with_capacity(response.hits.hits.len());
                for hit in &response.hits.hits {
                    match Self::hit_id(hit) {
                        Some(id) => ids.push(id),
                        None => warn!(hit_id = %hit.id, "Dropping hit with non-numeric id"),
                    }
                }
                ResultHits::Ids(ids)
            }
            FieldProjection::Fields(fields) => {
                let mut projections = Vec::with_capacity(response.hits.hits.len());
                for hit in &response.hits.hits {
                    match Self::projected_record(hit, fields) {
                        Some(record) => projections.push(record),
                        None => warn!(hit_id = %hit.id, "Dropping hit with non-numeric id"),
                    }
                }
                ResultHits::Projections(projections)
            }
        };

        ResultSet {
            hits,
            total,
            took_ms,
            aggregations: response.aggregations,
        }
    }

    /// The record ID for a hit: the source's `id` field, falling back to
    /// the engine `_id`.
    fn hit_id(hit: &EngineHit) -> Option<u64> {
        hit.source
            .as_ref()
            .and_then(|source| source.get("id"))
            .and_then(Value::as_u64)
            .or_else(|| hit.id.parse::<u64>().ok())
    }

    fn full_record(hit: EngineHit) -> Option<SearchRecord> {
        let source = hit.source?;
        let document: IndexDocument = match serde_json::from_value(source) {
            Ok(document) => document,
            Err(e) => {
                warn!(hit_id = %hit.id, error = %e, "Hit source does not match document schema");
                return None;
            }
        };

        Some(SearchRecord {
            document,
            relevance_score: hit.score,
            highlights: Self::highlight_map(hit.highlight),
            from_search: true,
        })
    }

    fn projected_record(hit: &EngineHit, fields: &[String]) -> Option<ProjectedRecord> {
        let id = Self::hit_id(hit)?;
        let mut projected = BTreeMap::new();
        if let Some(source) = &hit.source {
            for field in fields {
                if field == "id" {
                    continue;
                }
                if let Some(value) = source.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
        }
        Some(ProjectedRecord {
            id,
            fields: projected,
        })
    }

    fn highlight_map(highlight: Option<Value>) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        let Some(Value::Object(entries)) = highlight else {
            return map;
        };
        for (field, fragments) in entries {
            let fragments: Vec<String> = fragments
                .as_array()
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            map.insert(field, fragments);
        }
        map
    }
}

impl Default for ResultMapper {
    fn default() -> Self {
        Self::new()
    }
}
