//! Search request construction.
//!
//! Composes the engine bool query for a delegated request: weighted
//! free-text matching, exact-match filters, recursive meta clauses,
//! sorting on non-analyzed sub-fields, pagination, and tenant scoping.
//! For a fixed request the produced body is byte-identical across calls,
//! which is what makes delegated pagination deterministic.

use serde_json::{json, Map, Value};

use crate::config::IntegrationConfig;
use crate::errors::QueryError;
use sitesearch_repository::opensearch::mappings::index_alias;
use sitesearch_shared::{
    FieldProjection, MetaClause, MetaCompare, MetaCondition, MetaQuery, QueryRequest, Relation,
    SearchField, SortKey, SortOrder, SortSpec, TaxonomyFilter, TaxonomyOperator, TermRef,
};

/// The engine-native request derived from one [`QueryRequest`].
/// Stateless and discarded after use.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Aliases to query: the requesting tenant's, plus one per explicit
    /// cross-tenant opt-in.
    pub indices: Vec<String>,
    /// The JSON body sent to the search endpoint.
    pub body: Value,
    pub from: usize,
    pub size: usize,
}

/// Build the engine request for an eligible query.
pub(crate) fn build(
    request: &QueryRequest,
    config: &IntegrationConfig,
    index_prefix: &str,
    max_page_size: usize,
    max_result_window: usize,
) -> Result<SearchRequest, QueryError> {
    request.validate().map_err(QueryError::build)?;

    let size = request.page.per_page.min(max_page_size);
    let from = request.page.start_offset();
    if from + size > max_result_window {
        return Err(QueryError::PaginationDepth {
            requested: from + size,
            max: max_result_window,
        });
    }

    let mut should: Vec<Value> = Vec::new();
    let mut filter: Vec<Value> = Vec::new();
    let mut must_not: Vec<Value> = Vec::new();

    let search_fields = weighted_search_fields(request, config);
    if let Some(term) = request.search_term() {
        should.push(json!({
            "multi_match": {
                "query": term,
                "fields": search_fields.weighted
            }
        }));
    }

    if !request.include_ids.is_empty() {
        filter.push(json!({ "terms": { "id": request.include_ids } }));
    }
    if !request.exclude_ids.is_empty() {
        must_not.push(json!({ "terms": { "id": request.exclude_ids } }));
    }

    let statuses = effective_statuses(request, config);
    if !statuses.is_empty() {
        filter.push(json!({ "terms": { "status": statuses } }));
    }

    if let Some(author) = request.author {
        filter.push(json!({ "term": { "author.id": author } }));
    }

    for taxonomy in &request.taxonomies {
        match taxonomy.operator {
            TaxonomyOperator::In => filter.push(taxonomy_membership(taxonomy)),
            TaxonomyOperator::NotIn => must_not.push(taxonomy_membership(taxonomy)),
            TaxonomyOperator::And => {
                for term in &taxonomy.terms {
                    filter.push(single_term_membership(&taxonomy.taxonomy, term));
                }
            }
        }
    }

    if let Some(meta) = &request.meta {
        filter.push(meta_query_clause(meta)?);
    }

    let mut bool_query = Map::new();
    if !should.is_empty() {
        bool_query.insert("should".to_string(), Value::Array(should));
        // With only should clauses next to filters, the engine treats
        // matching as optional; require at least one.
        bool_query.insert("minimum_should_match".to_string(), json!(1));
    }
    if !filter.is_empty() {
        bool_query.insert("filter".to_string(), Value::Array(filter));
    }
    if !must_not.is_empty() {
        bool_query.insert("must_not".to_string(), Value::Array(must_not));
    }

    let query = if bool_query.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": Value::Object(bool_query) })
    };

    let mut body = json!({
        "from": from,
        "size": size,
        "query": query,
        "sort": sort_clauses(request)
    });

    match &request.projection {
        FieldProjection::Full => {}
        FieldProjection::Ids => {
            body["_source"] = json!(["id"]);
        }
        FieldProjection::Fields(fields) => {
            let mut source: Vec<&str> = vec!["id"];
            source.extend(fields.iter().map(String::as_str).filter(|f| *f != "id"));
            body["_source"] = json!(source);
        }
    }

    if request.highlight && request.search_term().is_some() {
        let tag = &config.highlight_tag;
        let mut highlight_fields = Map::new();
        for field in &search_fields.plain {
            highlight_fields.insert(field.clone(), json!({}));
        }
        body["highlight"] = json!({
            "pre_tags": [format!("<{}>", tag)],
            "post_tags": [format!("</{}>", tag)],
            "fields": Value::Object(highlight_fields)
        });
    }

    if !request.aggregations.is_empty() {
        let mut aggs = Map::new();
        for agg in &request.aggregations {
            aggs.insert(
                agg.name.clone(),
                json!({ "terms": { "field": agg.field } }),
            );
        }
        body["aggs"] = Value::Object(aggs);
    }

    Ok(SearchRequest {
        indices: target_indices(request, index_prefix),
        body,
        from,
        size,
    })
}

struct WeightedFields {
    /// `field^boost` strings for the multi_match clause.
    weighted: Vec<String>,
    /// Bare field names, for highlighting.
    plain: Vec<String>,
}

/// The weighted field set: the request's explicit override when present,
/// the configured boost table otherwise.
fn weighted_search_fields(request: &QueryRequest, config: &IntegrationConfig) -> WeightedFields {
    let fields: Vec<(SearchField, f32)> = if request.search_fields.is_empty() {
        config.search_boosts.clone()
    } else {
        request
            .search_fields
            .iter()
            .map(|field| (*field, config.boost_for(*field).unwrap_or(1.0)))
            .collect()
    };

    let mut weighted = Vec::with_capacity(fields.len());
    let mut plain = Vec::with_capacity(fields.len());
    for (field, boost) in fields {
        let name = field.field_name();
        weighted.push(format!("{}^{}", name, boost));
        plain.push(name.to_string());
    }
    WeightedFields { weighted, plain }
}

/// The status filter in effect: explicit request statuses, falling back
/// to the configured defaults for post queries.
fn effective_statuses(request: &QueryRequest, config: &IntegrationConfig) -> Vec<String> {
    if !request.statuses.is_empty() {
        return request.statuses.clone();
    }
    if request.kind == sitesearch_shared::ContentKind::Post {
        return config.default_statuses.clone();
    }
    Vec::new()
}

/// Nested membership query matching any of the filter's terms.
fn taxonomy_membership(filter: &TaxonomyFilter) -> Value {
    let mut ids: Vec<u64> = Vec::new();
    let mut slugs: Vec<&str> = Vec::new();
    for term in &filter.terms {
        match term {
            TermRef::Id(id) => ids.push(*id),
            TermRef::Slug(slug) => slugs.push(slug),
        }
    }

    let mut inner = Map::new();
    inner.insert(
        "filter".to_string(),
        json!([{ "term": { "terms.taxonomy": filter.taxonomy } }]),
    );

    let mut matches: Vec<Value> = Vec::new();
    if !ids.is_empty() {
        matches.push(json!({ "terms": { "terms.term_id": ids } }));
    }
    if !slugs.is_empty() {
        matches.push(json!({ "terms": { "terms.slug": slugs } }));
    }
    inner.insert("should".to_string(), Value::Array(matches));
    inner.insert("minimum_should_match".to_string(), json!(1));

    json!({
        "nested": {
            "path": "terms",
            "query": { "bool": Value::Object(inner) }
        }
    })
}

/// Nested membership query for exactly one term (AND semantics build one
/// of these per term).
fn single_term_membership(taxonomy: &str, term: &TermRef) -> Value {
    let term_clause = match term {
        TermRef::Id(id) => json!({ "term": { "terms.term_id": id } }),
        TermRef::Slug(slug) => json!({ "term": { "terms.slug": slug } }),
    };
    json!({
        "nested": {
            "path": "terms",
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "terms.taxonomy": taxonomy } },
                        term_clause
                    ]
                }
            }
        }
    })
}

/// Recursive meta query translation: AND maps to `must`, OR maps to
/// `should` with a minimum match of one.
fn meta_query_clause(meta: &MetaQuery) -> Result<Value, QueryError> {
    let clauses = meta
        .clauses
        .iter()
        .map(|clause| match clause {
            MetaClause::Condition(condition) => meta_condition_clause(condition),
            MetaClause::Group(group) => meta_query_clause(group),
        })
        .collect::<Result<Vec<Value>, QueryError>>()?;

    Ok(match meta.relation {
        Relation::And => json!({ "bool": { "must": clauses } }),
        Relation::Or => json!({ "bool": { "should": clauses, "minimum_should_match": 1 } }),
    })
}

fn nested_meta(query: Value) -> Value {
    json!({ "nested": { "path": "meta", "query": query } })
}

fn meta_key_term(key: &str) -> Value {
    json!({ "term": { "meta.key": key } })
}

/// One leaf comparison. Numeric comparators target the `value_number`
/// shadow field when the operand parses as a number, and fall back to
/// byte-order ranges on the sortable sub-field otherwise.
fn meta_condition_clause(condition: &MetaCondition) -> Result<Value, QueryError> {
    let key = condition.key.as_str();
    let values = &condition.values;

    let clause = match condition.compare {
        MetaCompare::Equal => nested_meta(json!({
            "bool": { "filter": [
                meta_key_term(key),
                { "term": { "meta.value.sortable": values[0] } }
            ]}
        })),
        MetaCompare::NotEqual => json!({
            "bool": { "must_not": [nested_meta(json!({
                "bool": { "filter": [
                    meta_key_term(key),
                    { "term": { "meta.value.sortable": values[0] } }
                ]}
            }))]}
        }),
        MetaCompare::Exists => nested_meta(json!({
            "bool": { "filter": [meta_key_term(key)] }
        })),
        MetaCompare::NotExists => json!({
            "bool": { "must_not": [nested_meta(json!({
                "bool": { "filter": [meta_key_term(key)] }
            }))]}
        }),
        MetaCompare::Like => nested_meta(json!({
            "bool": {
                "filter": [meta_key_term(key)],
                "must": [{ "match": { "meta.value": values[0] } }]
            }
        })),
        MetaCompare::In => nested_meta(json!({
            "bool": { "filter": [
                meta_key_term(key),
                { "terms": { "meta.value.sortable": values } }
            ]}
        })),
        MetaCompare::NotIn => json!({
            "bool": { "must_not": [nested_meta(json!({
                "bool": { "filter": [
                    meta_key_term(key),
                    { "terms": { "meta.value.sortable": values } }
                ]}
            }))]}
        }),
        MetaCompare::Greater => meta_range(key, "gt", &values[0]),
        MetaCompare::GreaterEqual => meta_range(key, "gte", &values[0]),
        MetaCompare::Less => meta_range(key, "lt", &values[0]),
        MetaCompare::LessEqual => meta_range(key, "lte", &values[0]),
        MetaCompare::Between => {
            let low = parse_number(&values[0]);
            let high = parse_number(&values[1]);
            let range = match (low, high) {
                (Some(low), Some(high)) => {
                    json!({ "range": { "meta.value_number": { "gte": low, "lte": high } } })
                }
                _ => json!({
                    "range": { "meta.value.sortable": { "gte": values[0], "lte": values[1] } }
                }),
            };
            nested_meta(json!({
                "bool": { "filter": [meta_key_term(key), range] }
            }))
        }
    };

    Ok(clause)
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn meta_range(key: &str, op: &str, value: &str) -> Value {
    let range = match parse_number(value) {
        Some(number) => json!({ "range": { "meta.value_number": { op: number } } }),
        None => json!({ "range": { "meta.value.sortable": { op: value } } }),
    };
    nested_meta(json!({
        "bool": { "filter": [meta_key_term(key), range] }
    }))
}

/// Map one sort spec onto its engine clause. String sorts always target
/// the non-analyzed sub-field.
fn sort_clause(spec: &SortSpec) -> Value {
    let order = spec.order.as_str();
    match &spec.key {
        SortKey::Relevance => json!({ "_score": { "order": order } }),
        SortKey::Id => json!({ "id": { "order": order } }),
        SortKey::Title => json!({ "title.sortable": { "order": order } }),
        SortKey::Date => json!({ "created_at": { "order": order } }),
        SortKey::Modified => json!({ "modified_at": { "order": order } }),
        SortKey::Slug => json!({ "slug": { "order": order } }),
        SortKey::Author => json!({ "author.display_name.sortable": { "order": order } }),
        SortKey::MetaValue(key) => json!({
            "meta.value.sortable": {
                "order": order,
                "nested": { "path": "meta", "filter": { "term": { "meta.key": key } } }
            }
        }),
        SortKey::MetaValueNum(key) => json!({
            "meta.value_number": {
                "order": order,
                "nested": { "path": "meta", "filter": { "term": { "meta.key": key } } }
            }
        }),
        // Random order cannot be reproduced deterministically on the
        // engine path; an opted-in request degrades to relevance.
        SortKey::Random => json!({ "_score": { "order": "desc" } }),
    }
}

/// The full sort array, with the configured default when the request
/// names no keys and a trailing `id asc` tie-break so equal-scored pages
/// paginate deterministically.
fn sort_clauses(request: &QueryRequest) -> Vec<Value> {
    let mut sorts: Vec<Value> = Vec::new();

    if request.sorts.is_empty() {
        if request.search_term().is_some() {
            sorts.push(json!({ "_score": { "order": "desc" } }));
        } else {
            sorts.push(json!({ "created_at": { "order": "desc" } }));
        }
    } else {
        for spec in &request.sorts {
            sorts.push(sort_clause(spec));
        }
    }

    let ends_with_id = request
        .sorts
        .last()
        .map(|spec| spec.key == SortKey::Id)
        .unwrap_or(false);
    if !ends_with_id {
        sorts.push(json!({ "id": { "order": "asc" } }));
    }

    sorts
}

/// The aliases a delegated query targets: the requesting tenant's, then
/// each explicitly opted-in cross tenant in ascending order.
fn target_indices(request: &QueryRequest, index_prefix: &str) -> Vec<String> {
    let primary = index_alias(index_prefix, request.tenant, request.kind);
    let mut indices = vec![primary];

    let mut cross: Vec<u64> = request
        .cross_tenants
        .iter()
        .copied()
        .filter(|tenant| *tenant != request.tenant)
        .collect();
    cross.sort_unstable();
    cross.dedup();
    for tenant in cross {
        indices.push(index_alias(index_prefix, tenant, request.kind));
    }

    indices
}
