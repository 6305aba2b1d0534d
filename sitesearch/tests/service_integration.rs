//! Integration tests for the search service.
//!
//! These tests use the real service, coordinator, translator, and result
//! mapper but mock the host store and the engine provider, so the whole
//! pipeline is exercised without a running search engine.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use sitesearch::{
    ContentStore, FallbackReason, IntegrationConfig, QueryOutcome, SearchService, StoreError,
    SyncQueue,
};
use sitesearch_repository::types::{BulkItemFailure, BulkSummary};
use sitesearch_repository::{EngineConfig, EngineError, EngineSearchResponse, SearchEngineProvider};
use sitesearch_shared::{
    ContentKey, ContentKind, ContentRecord, FieldProjection, IndexDocument, MutationEvent,
    QueryRequest, RelatedData, ResultHits,
};

// Mock host store backed by a hash map.
struct MockStore {
    records: Mutex<HashMap<ContentKey, ContentRecord>>,
}

impl MockStore {
    fn new(records: Vec<ContentRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.key, r)).collect()),
        }
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn get_record(&self, key: &ContentKey) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn get_related(&self, _key: &ContentKey) -> Result<RelatedData, StoreError> {
        Ok(RelatedData::default())
    }
}

// Mock engine provider recording bulk and search traffic.
#[derive(Default)]
struct MockProvider {
    reject_ids: BTreeSet<u64>,
    upsert_batches: Mutex<Vec<Vec<u64>>>,
    delete_batches: Mutex<Vec<Vec<u64>>>,
    search_calls: Mutex<Vec<(Vec<String>, Value)>>,
    search_response: Option<Value>,
    engine_down: bool,
}

impl MockProvider {
    fn with_search_response(response: Value) -> Self {
        Self {
            search_response: Some(response),
            ..Default::default()
        }
    }

    fn summarize(&self, ids: &[u64]) -> BulkSummary {
        let failures: Vec<BulkItemFailure> = ids
            .iter()
            .filter(|id| self.reject_ids.contains(id))
            .map(|id| BulkItemFailure {
                id: id.to_string(),
                status: 400,
                reason: "mapper_parsing_exception".to_string(),
            })
            .collect();
        BulkSummary {
            total: ids.len(),
            succeeded: ids.len() - failures.len(),
            failed: failures.len(),
            failures,
        }
    }
}

#[async_trait]
impl SearchEngineProvider for MockProvider {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn index_exists(&self, _index: &str) -> Result<bool, EngineError> {
        Ok(true)
    }

    async fn create_index(&self, _index: &str, _body: &Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn delete_index(&self, _index: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn put_mapping(&self, _index: &str, _mapping: &Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn mapping_version(&self, _index: &str) -> Result<Option<u32>, EngineError> {
        Ok(Some(1))
    }

    async fn count_documents(&self, _index: &str) -> Result<u64, EngineError> {
        Ok(0)
    }

    async fn swap_alias(
        &self,
        _alias: &str,
        _old_index: Option<&str>,
        _new_index: &str,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        _index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, EngineError> {
        let ids: Vec<u64> = documents.iter().map(|d| d.id).collect();
        self.upsert_batches.lock().unwrap().push(ids.clone());
        Ok(self.summarize(&ids))
    }

    async fn bulk_delete(&self, _index: &str, ids: &[u64]) -> Result<BulkSummary, EngineError> {
        self.delete_batches.lock().unwrap().push(ids.to_vec());
        Ok(self.summarize(ids))
    }

    async fn search(
        &self,
        indices: &[String],
        body: &Value,
    ) -> Result<EngineSearchResponse, EngineError> {
        if self.engine_down {
            return Err(EngineError::unavailable("connection refused"));
        }
        self.search_calls
            .lock()
            .unwrap()
            .push((indices.to_vec(), body.clone()));

        let response = self.search_response.clone().unwrap_or_else(|| {
            json!({ "took": 1, "hits": { "total": { "value": 0, "relation": "eq" }, "hits": [] } })
        });
        serde_json::from_value(response).map_err(|e| EngineError::parse(e.to_string()))
    }
}

fn post_key(id: u64) -> ContentKey {
    ContentKey::new(1, ContentKind::Post, id)
}

fn post(id: u64) -> ContentRecord {
    ContentRecord::new(post_key(id))
        .with_title(format!("Post {}", id))
        .with_status("publish")
}

fn service(store: MockStore, provider: Arc<MockProvider>) -> SearchService {
    SearchService::new(
        Arc::new(store),
        provider,
        EngineConfig::default(),
        IntegrationConfig::default(),
    )
}

fn hit(id: u64, score: f64) -> Value {
    json!({
        "_id": id.to_string(),
        "_score": score,
        "_source": { "id": id, "tenant": 1, "kind": "post", "title": format!("Post {}", id) }
    })
}

#[tokio::test]
async fn test_enqueue_n_times_flush_once_upserts_once() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(vec![post(5)]), provider.clone());

    let mut queue = SyncQueue::new();
    for _ in 0..10 {
        service.observe(&mut queue, &MutationEvent::updated(post_key(5)));
    }

    let result = service.flush(&mut queue).await;

    assert_eq!(
        provider.upsert_batches.lock().unwrap().clone(),
        vec![vec![5]]
    );
    assert_eq!(result.upserted, vec![post_key(5)]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_partial_bulk_failure_isolation() {
    let provider = Arc::new(MockProvider {
        reject_ids: BTreeSet::from([4]),
        ..Default::default()
    });
    let service = service(MockStore::new((1..=10).map(post).collect()), provider.clone());

    let mut queue = SyncQueue::new();
    for id in 1..=10 {
        service.enqueue(&mut queue, post_key(id));
    }

    let result = service.flush(&mut queue).await;

    assert_eq!(result.upserted.len(), 9);
    assert_eq!(result.failed_keys(), vec![post_key(4)]);
    // The queue keeps neither the successes nor the failure; re-enqueue
    // is an explicit caller decision.
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_delete_events_flow_to_bulk_delete() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(vec![post(1)]), provider.clone());

    let mut queue = SyncQueue::new();
    queue.observe(&MutationEvent::updated(post_key(1)));
    queue.observe(&MutationEvent::deleted(post_key(2)));

    let result = service.flush(&mut queue).await;

    assert_eq!(provider.delete_batches.lock().unwrap().clone(), vec![vec![2]]);
    assert_eq!(result.deleted, vec![post_key(2)]);
    assert_eq!(result.upserted, vec![post_key(1)]);
}

#[tokio::test]
async fn test_eligibility_routing_end_to_end() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(Vec::new()), provider.clone());

    // No term, no opt-in: native.
    let outcome = service
        .translate_and_execute(&QueryRequest::new(1, ContentKind::Post))
        .await;
    assert!(matches!(
        outcome,
        QueryOutcome::Native(FallbackReason::NoSearchTerm)
    ));

    // Same request with opt-in: delegated.
    let outcome = service
        .translate_and_execute(&QueryRequest::new(1, ContentKind::Post).with_integration(true))
        .await;
    assert!(matches!(outcome, QueryOutcome::Delegated(_)));

    // Opt-out wins over a search term.
    let outcome = service
        .translate_and_execute(
            &QueryRequest::new(1, ContentKind::Post)
                .with_search("coffee")
                .with_integration(false),
        )
        .await;
    assert!(matches!(
        outcome,
        QueryOutcome::Native(FallbackReason::OptedOut)
    ));

    // Only the opt-in request hit the engine.
    assert_eq!(provider.search_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_total_independent_of_page_size() {
    let response = json!({
        "took": 2,
        "hits": {
            "total": { "value": 5, "relation": "eq" },
            "hits": [hit(3, 1.8)]
        }
    });
    let provider = Arc::new(MockProvider::with_search_response(response));
    let service = service(MockStore::new(Vec::new()), provider);

    let request = QueryRequest::new(1, ContentKind::Post)
        .with_search("coffee")
        .with_pagination(1, 1);
    let outcome = service.translate_and_execute(&request).await;

    let set = outcome.result_set().expect("delegated");
    assert_eq!(set.total, 5);
    assert_eq!(set.len(), 1);
}

#[tokio::test]
async fn test_delegated_order_is_engine_order() {
    let response = json!({
        "took": 2,
        "hits": {
            "total": { "value": 3, "relation": "eq" },
            "hits": [hit(9, 3.0), hit(1, 2.0), hit(5, 1.0)]
        }
    });
    let provider = Arc::new(MockProvider::with_search_response(response));
    let service = service(MockStore::new(Vec::new()), provider);

    let request = QueryRequest::new(1, ContentKind::Post)
        .with_search("coffee")
        .with_projection(FieldProjection::Ids);
    let outcome = service.translate_and_execute(&request).await;

    let set = outcome.result_set().expect("delegated");
    assert_eq!(set.hits, ResultHits::Ids(vec![9, 1, 5]));
}

#[tokio::test]
async fn test_engine_failure_falls_back_to_native() {
    let provider = Arc::new(MockProvider {
        engine_down: true,
        ..Default::default()
    });
    let service = service(MockStore::new(Vec::new()), provider);

    let request = QueryRequest::new(1, ContentKind::Post).with_search("coffee");
    let outcome = service.translate_and_execute(&request).await;

    assert!(matches!(
        outcome,
        QueryOutcome::Native(FallbackReason::EngineFailed(_))
    ));
}

#[tokio::test]
async fn test_delegated_query_scopes_to_tenant_aliases() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(Vec::new()), provider.clone());

    let request = QueryRequest::new(3, ContentKind::Post).with_search("coffee");
    service.translate_and_execute(&request).await;

    let request = QueryRequest::new(3, ContentKind::Post)
        .with_search("coffee")
        .with_cross_tenants(vec![7]);
    service.translate_and_execute(&request).await;

    let calls = provider.search_calls.lock().unwrap().clone();
    assert_eq!(calls[0].0, vec!["sitesearch-3-post".to_string()]);
    assert_eq!(
        calls[1].0,
        vec!["sitesearch-3-post".to_string(), "sitesearch-7-post".to_string()]
    );
}

#[tokio::test]
async fn test_delegated_body_carries_tie_break_sort() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(Vec::new()), provider.clone());

    let request = QueryRequest::new(1, ContentKind::Post).with_search("coffee");
    service.translate_and_execute(&request).await;

    let calls = provider.search_calls.lock().unwrap().clone();
    let sort = calls[0].1["sort"].as_array().unwrap();
    assert_eq!(sort.last().unwrap(), &json!({ "id": { "order": "asc" } }));
}

#[tokio::test]
async fn test_index_lifecycle_passthrough() {
    let provider = Arc::new(MockProvider::default());
    let service = service(MockStore::new(Vec::new()), provider);

    let descriptor = service.ensure_index(1, ContentKind::Post).await.unwrap();
    assert_eq!(descriptor.alias, "sitesearch-1-post");

    service.put_mapping(1, ContentKind::Post).await.unwrap();
    service.delete_index(1, ContentKind::Post).await.unwrap();
}
