//! Sync coordinator.
//!
//! Drains the sync queue at a checkpoint and drives the write path:
//! re-read current record state from the host store, apply the
//! kill-switch policy, map to documents, and issue chunked bulk requests
//! per (tenant, kind) group. Batches within one flush run sequentially
//! so index mutations keep a deterministic per-tenant order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::IntegrationConfig;
use crate::errors::SyncError;
use crate::mapper::DocumentMapper;
use crate::queue::{AllowAll, FlushResult, SyncPolicy, SyncQueue};
use crate::store::ContentStore;
use sitesearch_repository::{IndexManager, SearchEngineProvider};
use sitesearch_shared::{ContentKey, ContentKind, IndexDocument};

/// Drives queue flushes against the search engine.
pub struct SyncCoordinator {
    store: Arc<dyn ContentStore>,
    provider: Arc<dyn SearchEngineProvider>,
    manager: IndexManager,
    mapper: DocumentMapper,
    policy: Arc<dyn SyncPolicy>,
    batch_size: usize,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn SearchEngineProvider>,
        manager: IndexManager,
        config: &IntegrationConfig,
    ) -> Self {
        Self {
            store,
            provider,
            manager,
            mapper: DocumentMapper::new(),
            policy: Arc::new(AllowAll),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Replace the kill-switch policy.
    pub fn with_policy(mut self, policy: Arc<dyn SyncPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Flush every pending entry in the queue.
    ///
    /// The queue is drained up front: keys that fail are reported in the
    /// result but not retained, so the caller decides whether to
    /// re-enqueue them. Sync failures never propagate as errors from
    /// here; the write path of the source store must not be coupled to
    /// search-index health.
    #[instrument(skip(self, queue), fields(pending = queue.len()))]
    pub async fn flush(&self, queue: &mut SyncQueue) -> FlushResult {
        let upserts = queue.drain_upserts();
        let deletes = queue.drain_deletes();
        let mut result = FlushResult::default();

        for ((tenant, kind), ids) in Self::group_by_index(upserts) {
            self.flush_upserts(tenant, kind, &ids, &mut result).await;
        }
        for ((tenant, kind), ids) in Self::group_by_index(deletes) {
            self.flush_deletes(tenant, kind, &ids, &mut result).await;
        }

        info!(
            upserted = result.upserted.len(),
            deleted = result.deleted.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Sync flush complete"
        );
        result
    }

    /// Group keys by the index they land in, preserving key order inside
    /// each group.
    fn group_by_index(keys: Vec<ContentKey>) -> BTreeMap<(u64, ContentKind), Vec<u64>> {
        let mut groups: BTreeMap<(u64, ContentKind), Vec<u64>> = BTreeMap::new();
        for key in keys {
            groups.entry((key.tenant, key.kind)).or_default().push(key.id);
        }
        groups
    }

    async fn flush_upserts(
        &self,
        tenant: u64,
        kind: ContentKind,
        ids: &[u64],
        result: &mut FlushResult,
    ) {
        let descriptor = match self.manager.ensure_index(tenant, kind).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(tenant, kind = %kind, error = %e, "Index unavailable, failing group");
                for &id in ids {
                    result.fail(
                        ContentKey::new(tenant, kind, id),
                        format!("index unavailable: {}", e),
                    );
                }
                return;
            }
        };

        for batch in ids.chunks(self.batch_size) {
            let mut documents = Vec::with_capacity(batch.len());
            for &id in batch {
                let key = ContentKey::new(tenant, kind, id);
                match self.load_document(&key).await {
                    Ok(Some(document)) => documents.push(document),
                    Ok(None) => result.skipped.push(key),
                    Err(e) => result.fail(key, e.to_string()),
                }
            }

            if documents.is_empty() {
                continue;
            }

            match self.provider.bulk_upsert(&descriptor.alias, &documents).await {
                Ok(summary) => {
                    let failures: HashMap<&str, &str> = summary
                        .failures
                        .iter()
                        .map(|f| (f.id.as_str(), f.reason.as_str()))
                        .collect();
                    for document in &documents {
                        let doc_id = document.document_id();
                        match failures.get(doc_id.as_str()) {
                            Some(reason) => result.fail(document.key(), *reason),
                            None => result.upserted.push(document.key()),
                        }
                    }
                    if summary.failed > 0 {
                        warn!(
                            index = %descriptor.alias,
                            succeeded = summary.succeeded,
                            failed = summary.failed,
                            "Bulk upsert completed with item failures"
                        );
                    }
                }
                Err(e) => {
                    warn!(index = %descriptor.alias, error = %e, "Bulk upsert failed");
                    for document in &documents {
                        result.fail(document.key(), e.to_string());
                    }
                }
            }
        }
    }

    /// Re-read a record at flush time and map it, honoring the
    /// kill-switch. `None` means the record should not be synced.
    async fn load_document(&self, key: &ContentKey) -> Result<Option<IndexDocument>, SyncError> {
        let Some(record) = self.store.get_record(key).await? else {
            debug!(key = %key, "Record gone by flush time, skipping");
            return Ok(None);
        };
        if !self.policy.should_index(&record) {
            debug!(key = %key, "Sync vetoed by policy");
            return Ok(None);
        }
        let related = self.store.get_related(key).await?;
        Ok(Some(self.mapper.map(&record, &related)))
    }

    async fn flush_deletes(
        &self,
        tenant: u64,
        kind: ContentKind,
        ids: &[u64],
        result: &mut FlushResult,
    ) {
        let descriptor = self.manager.resolve(tenant, kind);

        match self.provider.bulk_delete(&descriptor.alias, ids).await {
            Ok(summary) => {
                let failures: HashMap<&str, &str> = summary
                    .failures
                    .iter()
                    .map(|f| (f.id.as_str(), f.reason.as_str()))
                    .collect();
                for &id in ids {
                    let key = ContentKey::new(tenant, kind, id);
                    match failures.get(id.to_string().as_str()) {
                        Some(reason) => result.fail(key, *reason),
                        None => result.deleted.push(key),
                    }
                }
            }
            Err(e) => {
                warn!(index = %descriptor.alias, error = %e, "Bulk delete failed");
                for &id in ids {
                    result.fail(ContentKey::new(tenant, kind, id), e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use crate::store::StoreError;
    use sitesearch_repository::types::{BulkItemFailure, BulkSummary};
    use sitesearch_repository::{EngineError, EngineSearchResponse};
    use sitesearch_shared::{ContentRecord, RelatedData};

    struct MockStore {
        records: Mutex<HashMap<ContentKey, ContentRecord>>,
    }

    impl MockStore {
        fn new(records: Vec<ContentRecord>) -> Self {
            Self {
                records: Mutex::new(records.into_iter().map(|r| (r.key, r)).collect()),
            }
        }

        fn update_title(&self, key: &ContentKey, title: &str) {
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records.get_mut(key) {
                record.title = Some(title.to_string());
            }
        }

        fn remove(&self, key: &ContentKey) {
            self.records.lock().unwrap().remove(key);
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

    #[derive(Default)]
    struct MockProvider {
        /// Document IDs the fake engine rejects at item level.
        reject_ids: BTreeSet<u64>,
        /// Upsert batches received.
        upsert_docs: Mutex<Vec<Vec<IndexDocument>>>,
        delete_batches: Mutex<Vec<Vec<u64>>>,
        transport_down: bool,
    }

    impl MockProvider {
        fn upsert_batches(&self) -> Vec<Vec<u64>> {
            self.upsert_docs
                .lock()
                .unwrap()
                .iter()
                .map(|batch| batch.iter().map(|d| d.id).collect())
                .collect()
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
            if self.transport_down {
                return Err(EngineError::unavailable("connection refused"));
            }
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
            self.upsert_docs.lock().unwrap().push(documents.to_vec());
            Ok(self.summarize(&ids))
        }

        async fn bulk_delete(&self, _index: &str, ids: &[u64]) -> Result<BulkSummary, EngineError> {
            self.delete_batches.lock().unwrap().push(ids.to_vec());
            Ok(self.summarize(ids))
        }

        async fn search(
            &self,
            _indices: &[String],
            _body: &Value,
        ) -> Result<EngineSearchResponse, EngineError> {
            Err(EngineError::unavailable("not implemented"))
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

    fn coordinator(
        store: Arc<MockStore>,
        provider: Arc<MockProvider>,
        batch_size: usize,
    ) -> SyncCoordinator {
        let manager = IndexManager::new(provider.clone(), "sitesearch-");
        let config = IntegrationConfig {
            batch_size,
            ..IntegrationConfig::default()
        };
        SyncCoordinator::new(store, provider, manager, &config)
    }

    #[tokio::test]
    async fn test_idempotent_convergence() {
        let store = Arc::new(MockStore::new(vec![post(5)]));
        let provider = Arc::new(MockProvider::default());
        let coordinator = coordinator(store, provider.clone(), 350);

        let mut queue = SyncQueue::new();
        for _ in 0..4 {
            queue.enqueue(post_key(5));
        }

        let result = coordinator.flush(&mut queue).await;

        assert_eq!(provider.upsert_batches(), vec![vec![5]]);
        assert_eq!(result.upserted, vec![post_key(5)]);
        assert!(result.is_clean());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_partial_bulk_failure_isolation() {
        let store = Arc::new(MockStore::new((1..=10).map(post).collect()));
        let provider = Arc::new(MockProvider {
            reject_ids: BTreeSet::from([4]),
            ..Default::default()
        });
        let coordinator = coordinator(store, provider.clone(), 350);

        let mut queue = SyncQueue::new();
        for id in 1..=10 {
            queue.enqueue(post_key(id));
        }

        let result = coordinator.flush(&mut queue).await;

        assert_eq!(result.upserted.len(), 9);
        assert_eq!(result.failed_keys(), vec![post_key(4)]);
        assert_eq!(result.failed[0].reason, "mapper_parsing_exception");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_flush_reads_state_at_flush_time() {
        let store = Arc::new(MockStore::new(vec![post(7)]));
        let provider = Arc::new(MockProvider::default());
        let coordinator = coordinator(store.clone(), provider.clone(), 350);

        let mut queue = SyncQueue::new();
        queue.enqueue(post_key(7));

        // The record changes after enqueue; the flushed document must
        // carry the newer state.
        store.update_title(&post_key(7), "Updated after enqueue");

        coordinator.flush(&mut queue).await;

        let batches = provider.upsert_docs.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0][0].title.as_deref(),
            Some("Updated after enqueue")
        );
    }

    #[tokio::test]
    async fn test_record_gone_by_flush_is_skipped() {
        let store = Arc::new(MockStore::new(vec![post(1), post(2)]));
        let provider = Arc::new(MockProvider::default());
        let coordinator = coordinator(store.clone(), provider.clone(), 350);

        let mut queue = SyncQueue::new();
        queue.enqueue(post_key(1));
        queue.enqueue(post_key(2));
        store.remove(&post_key(2));

        let result = coordinator.flush(&mut queue).await;

        assert_eq!(result.upserted, vec![post_key(1)]);
        assert_eq!(result.skipped, vec![post_key(2)]);
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_policy_vetoes_items() {
        struct PublishedOnly;
        impl SyncPolicy for PublishedOnly {
            fn should_index(&self, record: &ContentRecord) -> bool {
                record.status.as_deref() == Some("publish")
            }
        }

        let draft = ContentRecord::new(post_key(2))
            .with_title("Draft")
            .with_status("draft");
        let store = Arc::new(MockStore::new(vec![post(1), draft]));
        let provider = Arc::new(MockProvider::default());
        let coordinator =
            coordinator(store, provider.clone(), 350).with_policy(Arc::new(PublishedOnly));

        let mut queue = SyncQueue::new();
        queue.enqueue(post_key(1));
        queue.enqueue(post_key(2));

        let result = coordinator.flush(&mut queue).await;

        assert_eq!(result.upserted, vec![post_key(1)]);
        assert_eq!(result.skipped, vec![post_key(2)]);
    }

    #[tokio::test]
    async fn test_batches_are_chunked_and_sequential() {
        let store = Arc::new(MockStore::new((1..=5).map(post).collect()));
        let provider = Arc::new(MockProvider::default());
        let coordinator = coordinator(store, provider.clone(), 2);

        let mut queue = SyncQueue::new();
        for id in 1..=5 {
            queue.enqueue(post_key(id));
        }

        coordinator.flush(&mut queue).await;

        assert_eq!(
            provider.upsert_batches(),
            vec![vec![1, 2], vec![3, 4], vec![5]]
        );
    }

    #[tokio::test]
    async fn test_deletes_flushed_in_bulk() {
        let store = Arc::new(MockStore::new(Vec::new()));
        let provider = Arc::new(MockProvider::default());
        let coordinator = coordinator(store, provider.clone(), 350);

        let mut queue = SyncQueue::new();
        queue.observe(&sitesearch_shared::MutationEvent::deleted(post_key(8)));
        queue.observe(&sitesearch_shared::MutationEvent::deleted(post_key(9)));

        let result = coordinator.flush(&mut queue).await;

        let batches = provider.delete_batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec![8, 9]]);
        assert_eq!(result.deleted, vec![post_key(8), post_key(9)]);
    }

    #[tokio::test]
    async fn test_unreachable_engine_fails_group_without_panicking() {
        let store = Arc::new(MockStore::new(vec![post(1)]));
        let provider = Arc::new(MockProvider {
            transport_down: true,
            ..Default::default()
        });
        let coordinator = coordinator(store, provider, 350);

        let mut queue = SyncQueue::new();
        queue.enqueue(post_key(1));

        let result = coordinator.flush(&mut queue).await;

        assert_eq!(result.failed_keys(), vec![post_key(1)]);
        assert!(result.upserted.is_empty());
    }
}
