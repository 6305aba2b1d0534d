//! Native query request types.
//!
//! [`QueryRequest`] is the closed, validated form of a caller's
//! declarative query. It enumerates every filter kind the engine path
//! recognizes; concepts with no representation here are by definition not
//! forwarded to the search engine.

use serde::{Deserialize, Serialize};

use super::content::ContentKind;

/// A searchable field the free-text clause can target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Excerpt,
    Body,
    Slug,
    AuthorName,
}

impl SearchField {
    /// The engine field path this search field maps to.
    pub fn field_name(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Excerpt => "excerpt",
            SearchField::Body => "body",
            SearchField::Slug => "slug",
            SearchField::AuthorName => "author.display_name",
        }
    }
}

/// How sibling meta clauses combine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    #[default]
    And,
    Or,
}

/// Comparison operator for a meta condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetaCompare {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Exists,
    NotExists,
    Like,
    In,
    NotIn,
    Between,
}

impl MetaCompare {
    /// How many operand values the comparator requires: `(min, max)`,
    /// with `usize::MAX` meaning unbounded.
    fn arity(&self) -> (usize, usize) {
        match self {
            MetaCompare::Exists | MetaCompare::NotExists => (0, 0),
            MetaCompare::Between => (2, 2),
            MetaCompare::In | MetaCompare::NotIn => (1, usize::MAX),
            _ => (1, 1),
        }
    }
}

/// A single meta comparison against one key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaCondition {
    pub key: String,
    pub compare: MetaCompare,
    /// Operand values; arity depends on `compare` (none for EXISTS, two
    /// for BETWEEN, one or more for IN, exactly one otherwise).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl MetaCondition {
    pub fn new(key: impl Into<String>, compare: MetaCompare, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            compare,
            values,
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, MetaCompare::Equal, vec![value.into()])
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self::new(key, MetaCompare::Exists, Vec::new())
    }

    pub fn between(
        key: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self::new(key, MetaCompare::Between, vec![low.into(), high.into()])
    }

    fn validate(&self) -> Result<(), String> {
        if self.key.is_empty() {
            return Err("meta condition key cannot be empty".to_string());
        }
        let (min, max) = self.compare.arity();
        if self.values.len() < min || self.values.len() > max {
            return Err(format!(
                "meta comparator {:?} on '{}' takes {} value(s), got {}",
                self.compare,
                self.key,
                if min == max {
                    min.to_string()
                } else {
                    format!("{}+", min)
                },
                self.values.len()
            ));
        }
        Ok(())
    }
}

/// One element of a meta query: a leaf condition or a nested group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MetaClause {
    Condition(MetaCondition),
    Group(MetaQuery),
}

/// A compound meta query. Sibling clauses combine via `relation`
/// (AND by default); groups nest arbitrarily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaQuery {
    #[serde(default)]
    pub relation: Relation,
    pub clauses: Vec<MetaClause>,
}

impl MetaQuery {
    pub fn all(clauses: Vec<MetaClause>) -> Self {
        Self {
            relation: Relation::And,
            clauses,
        }
    }

    pub fn any(clauses: Vec<MetaClause>) -> Self {
        Self {
            relation: Relation::Or,
            clauses,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.clauses.is_empty() {
            return Err("meta query must contain at least one clause".to_string());
        }
        for clause in &self.clauses {
            match clause {
                MetaClause::Condition(c) => c.validate()?,
                MetaClause::Group(g) => g.validate()?,
            }
        }
        Ok(())
    }
}

/// Reference to a taxonomy term, by ID or by slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TermRef {
    Id(u64),
    Slug(String),
}

/// Set semantics for a taxonomy filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaxonomyOperator {
    /// Match records carrying any of the listed terms.
    #[default]
    In,
    /// Exclude records carrying any of the listed terms.
    NotIn,
    /// Match records carrying every listed term.
    And,
}

/// Filter on taxonomy term membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyFilter {
    pub taxonomy: String,
    pub terms: Vec<TermRef>,
    #[serde(default)]
    pub operator: TaxonomyOperator,
}

impl TaxonomyFilter {
    fn validate(&self) -> Result<(), String> {
        if self.taxonomy.is_empty() {
            return Err("taxonomy filter needs a taxonomy name".to_string());
        }
        if self.terms.is_empty() {
            return Err(format!(
                "taxonomy filter on '{}' needs at least one term",
                self.taxonomy
            ));
        }
        Ok(())
    }
}

/// Requested sort key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Relevance,
    Id,
    Title,
    Date,
    Modified,
    Slug,
    Author,
    /// Byte-order sort on a meta value under the given key.
    MetaValue(String),
    /// Numeric sort on a meta value under the given key.
    MetaValueNum(String),
    /// Randomized order. Not expressible deterministically on the engine
    /// path; blocks implicit delegation.
    Random,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One entry in an ordered multi-key sort specification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

/// Pagination parameters. `offset`, when set, overrides the page-derived
/// start position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub per_page: usize,
    /// 1-based page number.
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            per_page: 10,
            page: 1,
            offset: None,
        }
    }
}

impl Pagination {
    /// The absolute start offset this pagination resolves to.
    pub fn start_offset(&self) -> usize {
        self.offset
            .unwrap_or_else(|| self.page.saturating_sub(1).saturating_mul(self.per_page))
    }
}

/// Which shape of result objects the caller wants back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldProjection {
    /// Full record-shaped results.
    #[default]
    Full,
    /// Record IDs only.
    Ids,
    /// The named fields plus the ID.
    Fields(Vec<String>),
}

/// A terms-facet aggregation the caller wants computed alongside hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationRequest {
    pub name: String,
    pub field: String,
}

/// The caller's declarative query, immutable input to the translator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub tenant: u64,
    pub kind: ContentKind,
    /// Free-text search term.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Explicit opt-in (`Some(true)`) or opt-out (`Some(false)`) of engine
    /// delegation; `None` leaves the decision to the eligibility rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<bool>,
    /// Overrides the configured weighted field set when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_fields: Vec<SearchField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ids: Vec<u64>,
    /// Exact status filter; empty means the configured default for the
    /// kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxonomies: Vec<TaxonomyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub page: Pagination,
    /// Additional tenants to widen the search to. Cross-tenant scope is
    /// always an explicit opt-in, never implicit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cross_tenants: Vec<u64>,
    #[serde(default)]
    pub projection: FieldProjection,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationRequest>,
}

impl QueryRequest {
    /// Create a bare request for one tenant and kind.
    pub fn new(tenant: u64, kind: ContentKind) -> Self {
        Self {
            tenant,
            kind,
            search: None,
            integration: None,
            search_fields: Vec::new(),
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            statuses: Vec::new(),
            author: None,
            taxonomies: Vec::new(),
            meta: None,
            sorts: Vec::new(),
            page: Pagination::default(),
            cross_tenants: Vec::new(),
            projection: FieldProjection::Full,
            highlight: false,
            aggregations: Vec::new(),
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_integration(mut self, opt_in: bool) -> Self {
        self.integration = Some(opt_in);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<String>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_meta(mut self, meta: MetaQuery) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_taxonomy(mut self, filter: TaxonomyFilter) -> Self {
        self.taxonomies.push(filter);
        self
    }

    pub fn with_sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sorts.push(SortSpec::new(key, order));
        self
    }

    pub fn with_pagination(mut self, per_page: usize, page: usize) -> Self {
        self.page.per_page = per_page;
        self.page.page = page;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.page.offset = Some(offset);
        self
    }

    pub fn with_cross_tenants(mut self, tenants: Vec<u64>) -> Self {
        self.cross_tenants = tenants;
        self
    }

    pub fn with_projection(mut self, projection: FieldProjection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_highlight(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub fn with_aggregation(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.aggregations.push(AggregationRequest {
            name: name.into(),
            field: field.into(),
        });
        self
    }

    /// The trimmed search term, if one is present and non-empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Validate the request parameters.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.page.per_page == 0 {
            return Err("per_page must be at least 1".to_string());
        }
        if self.page.page == 0 {
            return Err("page numbers are 1-based".to_string());
        }
        for filter in &self.taxonomies {
            filter.validate()?;
        }
        if let Some(meta) = &self.meta {
            meta.validate()?;
        }
        for agg in &self.aggregations {
            if agg.name.is_empty() || agg.field.is_empty() {
                return Err("aggregations need both a name and a field".to_string());
            }
        }
        Ok(())
    }
}
