//! Content identity and record types.
//!
//! These types describe native entities as the host store exposes them.
//! The engine only ever reads them; the host store remains the source of
//! truth.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of native content an entity belongs to.
///
/// Each kind gets its own index per tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    User,
    Comment,
    Term,
}

impl ContentKind {
    /// All indexable kinds.
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Post,
        ContentKind::User,
        ContentKind::Comment,
        ContentKind::Term,
    ];

    /// The lowercase slug used in index names and documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::User => "user",
            ContentKind::Comment => "comment",
            ContentKind::Term => "term",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "user" => Ok(ContentKind::User),
            "comment" => Ok(ContentKind::Comment),
            "term" => Ok(ContentKind::Term),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// Unique identity of a native entity: tenant, kind, and numeric ID.
///
/// Keys order by `(tenant, kind, id)`, so sets of keys iterate in a
/// deterministic per-tenant order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentKey {
    pub tenant: u64,
    pub kind: ContentKind,
    pub id: u64,
}

impl ContentKey {
    pub fn new(tenant: u64, kind: ContentKind, id: u64) -> Self {
        Self { tenant, kind, id }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.kind, self.id)
    }
}

/// A point-in-time snapshot of a native entity, as read from the host
/// store.
///
/// One structure covers all content kinds; fields a kind does not have
/// stay `None`. The engine never mutates a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRecord {
    pub key: ContentKey,
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
    pub author_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    /// Create an empty record for the given key.
    pub fn new(key: ContentKey) -> Self {
        Self {
            key,
            title: None,
            body: None,
            excerpt: None,
            slug: None,
            status: None,
            parent_id: None,
            author_id: None,
            created_at: None,
            modified_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_author(mut self, author_id: u64) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

/// Author data joined to a record at mapping time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorData {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

/// A taxonomy term attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermEntry {
    pub taxonomy: String,
    pub term_id: u64,
    pub name: String,
    pub slug: String,
}

/// Side data joined to a [`ContentRecord`] when building an index
/// document: author, taxonomy terms, and metadata.
///
/// `meta` is a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelatedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<TermEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Vec<String>>,
}

impl RelatedData {
    pub fn with_author(mut self, author: AuthorData) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_term(mut self, term: TermEntry) -> Self {
        self.terms.push(term);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.meta.insert(key.into(), values);
        self
    }
}

/// The action a mutation event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
}

/// A typed content-mutation signal emitted by the host store.
///
/// The sync queue subscribes to these; handling is synchronous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationEvent {
    pub key: ContentKey,
    pub action: MutationAction,
}

impl MutationEvent {
    pub fn created(key: ContentKey) -> Self {
        Self {
            key,
            action: MutationAction::Created,
        }
    }

    pub fn updated(key: ContentKey) -> Self {
        Self {
            key,
            action: MutationAction::Updated,
        }
    }

    pub fn deleted(key: ContentKey) -> Self {
        Self {
            key,
            action: MutationAction::Deleted,
        }
    }
}
