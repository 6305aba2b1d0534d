//! Index document types.
//!
//! An [`IndexDocument`] is the denormalized representation of a content
//! record as it is stored in the search engine. It is a deterministic
//! pure function of the record and its related data at sync time, so any
//! document can be regenerated from the source store at any point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{AuthorData, ContentKey, ContentKind, TermEntry};

/// A single metadata entry, flattened to a nested-mapping list element.
///
/// `value_number` shadows `value` when the raw value parses as a finite
/// number, so numeric comparators and range filters have a typed field to
/// target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaEntry {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_number: Option<f64>,
}

impl MetaEntry {
    /// Create an entry, deriving the numeric shadow value from the raw
    /// string.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let value_number = value.trim().parse::<f64>().ok().filter(|n| n.is_finite());
        Self {
            key: key.into(),
            value,
            value_number,
        }
    }
}

/// Document representation for the search index, keyed by
/// `(tenant, kind, id)` through the per-tenant per-kind index it lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    pub id: u64,
    pub tenant: u64,
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<TermEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<MetaEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl IndexDocument {
    /// The engine `_id` for this document. Uniqueness comes from the
    /// per-`(tenant, kind)` index, so the record ID alone suffices.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }

    /// The content key this document was generated from.
    pub fn key(&self) -> ContentKey {
        ContentKey::new(self.tenant, self.kind, self.id)
    }
}
