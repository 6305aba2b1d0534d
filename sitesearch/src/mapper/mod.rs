//! Document mapper.
//!
//! Converts a content record plus its related data into the denormalized
//! index document. Mapping is a pure, total function: it performs no
//! I/O, reads no clock, and never fails on missing optional data, so the
//! same inputs always produce the same document.

use sitesearch_shared::{ContentRecord, IndexDocument, MetaEntry, RelatedData};

/// Maps content records to index documents.
pub struct DocumentMapper;

impl DocumentMapper {
    pub fn new() -> Self {
        Self
    }

    /// Build the index document for a record.
    ///
    /// Absent optional data maps to absent fields. Metadata is flattened
    /// to one entry per (key, value) pair, sorted, with numeric shadow
    /// values derived where the raw value parses as a number. Terms are
    /// sorted by (taxonomy, term_id) so document output is independent of
    /// the order the store returned them in.
    pub fn map(&self, record: &ContentRecord, related: &RelatedData) -> IndexDocument {
        let mut terms = related.terms.clone();
        terms.sort_by(|a, b| {
            (a.taxonomy.as_str(), a.term_id).cmp(&(b.taxonomy.as_str(), b.term_id))
        });

        // BTreeMap iteration is key-ordered; values keep store order, so
        // sort the flattened list outright.
        let mut meta: Vec<MetaEntry> = related
            .meta
            .iter()
            .flat_map(|(key, values)| {
                values
                    .iter()
                    .map(move |value| MetaEntry::new(key.clone(), value.clone()))
            })
            .collect();
        meta.sort_by(|a, b| (a.key.as_str(), a.value.as_str()).cmp(&(b.key.as_str(), b.value.as_str())));

        IndexDocument {
            id: record.key.id,
            tenant: record.key.tenant,
            kind: record.key.kind,
            title: record.title.clone(),
            body: record.body.clone(),
            excerpt: record.excerpt.clone(),
            slug: record.slug.clone(),
            status: record.status.clone(),
            parent_id: record.parent_id,
            author: related.author.clone(),
            terms,
            meta,
            created_at: record.created_at,
            modified_at: record.modified_at,
        }
    }
}

impl Default for DocumentMapper {
    fn default() -> Self {
        Self::new()
    }
}
