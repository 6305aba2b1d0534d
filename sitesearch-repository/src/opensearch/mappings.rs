//! Index settings, mappings, and naming for the per-kind content
//! indices.
//!
//! Every field that can appear in a sort clause carries a non-analyzed
//! `.sortable` keyword sub-field; string sorts must target the sub-field,
//! never the analyzed text field, or the resulting order is undefined.

use serde_json::{json, Map, Value};

use sitesearch_shared::ContentKind;

/// Current mapping generation. Recorded in each index's `_meta` so the
/// index manager can detect schema drift.
pub const MAPPING_VERSION: u32 = 1;

/// The alias for a tenant's index of the given kind, e.g.
/// `sitesearch-1-post`.
pub fn index_alias(prefix: &str, tenant: u64, kind: ContentKind) -> String {
    format!("{}{}-{}", prefix, tenant, kind.as_str())
}

/// The concrete versioned index name behind an alias, e.g.
/// `sitesearch-1-post-v1`.
pub fn versioned_index_name(alias: &str, version: u32) -> String {
    format!("{}-v{}", alias, version)
}

fn text_with_sortable() -> Value {
    json!({
        "type": "text",
        "fields": {
            "sortable": { "type": "keyword", "ignore_above": 10922 }
        }
    })
}

/// Field properties shared by every content kind.
fn base_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("id".to_string(), json!({ "type": "long" }));
    properties.insert("tenant".to_string(), json!({ "type": "long" }));
    properties.insert("kind".to_string(), json!({ "type": "keyword" }));
    properties.insert("title".to_string(), text_with_sortable());
    properties.insert("body".to_string(), json!({ "type": "text" }));
    properties.insert("slug".to_string(), json!({ "type": "keyword" }));
    properties.insert(
        "author".to_string(),
        json!({
            "properties": {
                "id": { "type": "long" },
                "display_name": {
                    "type": "text",
                    "fields": {
                        "sortable": { "type": "keyword", "ignore_above": 10922 }
                    }
                },
                "login": { "type": "keyword" }
            }
        }),
    );
    properties.insert(
        "terms".to_string(),
        json!({
            "type": "nested",
            "properties": {
                "taxonomy": { "type": "keyword" },
                "term_id": { "type": "long" },
                "name": {
                    "type": "text",
                    "fields": {
                        "sortable": { "type": "keyword", "ignore_above": 10922 }
                    }
                },
                "slug": { "type": "keyword" }
            }
        }),
    );
    properties.insert(
        "meta".to_string(),
        json!({
            "type": "nested",
            "properties": {
                "key": { "type": "keyword" },
                "value": {
                    "type": "text",
                    "fields": {
                        "sortable": { "type": "keyword", "ignore_above": 10922 }
                    }
                },
                "value_number": { "type": "double" }
            }
        }),
    );
    properties.insert("created_at".to_string(), json!({ "type": "date" }));
    properties.insert("modified_at".to_string(), json!({ "type": "date" }));
    properties
}

/// The mappings body for one content kind, including the `_meta` version
/// marker.
pub fn mapping_body(kind: ContentKind) -> Value {
    let mut properties = base_properties();

    match kind {
        ContentKind::Post => {
            properties.insert("excerpt".to_string(), text_with_sortable());
            properties.insert("status".to_string(), json!({ "type": "keyword" }));
            properties.insert("parent_id".to_string(), json!({ "type": "long" }));
        }
        ContentKind::Comment => {
            properties.insert("status".to_string(), json!({ "type": "keyword" }));
            properties.insert("parent_id".to_string(), json!({ "type": "long" }));
        }
        ContentKind::Term => {
            properties.insert("parent_id".to_string(), json!({ "type": "long" }));
        }
        ContentKind::User => {}
    }

    json!({
        "_meta": { "version": MAPPING_VERSION },
        "properties": Value::Object(properties)
    })
}

/// The full index-creation body for one content kind: settings, mappings,
/// and optionally an alias attached atomically at creation time.
pub fn index_body(kind: ContentKind, alias: Option<&str>) -> Value {
    let mut body = json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": mapping_body(kind)
    });

    if let Some(alias) = alias {
        body["aliases"] = json!({ alias: {} });
    }

    body
}
