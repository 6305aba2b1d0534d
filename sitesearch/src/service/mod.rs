//! Caller-facing service facade.
//!
//! The single surface UI/CLI collaborators consume: delegated query
//! execution with native fallback, queue flushing, and index lifecycle
//! operations.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::IntegrationConfig;
use crate::queue::{FlushResult, SyncPolicy, SyncQueue};
use crate::results::ResultMapper;
use crate::store::ContentStore;
use crate::sync::SyncCoordinator;
use crate::translator::{FallbackReason, QueryTranslator, Translation};
use sitesearch_repository::{
    EngineConfig, EngineError, IndexDescriptor, IndexManager, SearchEngineProvider,
};
use sitesearch_shared::{ContentKey, ContentKind, MutationEvent, QueryRequest, ResultSet};

/// Outcome of routing one native query.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The engine executed the query; here is the native-shaped result.
    Delegated(ResultSet),
    /// The host should execute the query natively. Carries why.
    Native(FallbackReason),
}

impl QueryOutcome {
    /// The result set, when the query was delegated.
    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            QueryOutcome::Delegated(set) => Some(set),
            QueryOutcome::Native(_) => None,
        }
    }
}

/// The integration engine's caller interface.
pub struct SearchService {
    provider: Arc<dyn SearchEngineProvider>,
    manager: IndexManager,
    translator: QueryTranslator,
    coordinator: SyncCoordinator,
    result_mapper: ResultMapper,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn SearchEngineProvider>,
        engine_config: EngineConfig,
        config: IntegrationConfig,
    ) -> Self {
        let manager = IndexManager::new(provider.clone(), engine_config.index_prefix.clone());
        let coordinator =
            SyncCoordinator::new(store, provider.clone(), manager.clone(), &config);
        let translator = QueryTranslator::new(config, &engine_config);

        Self {
            provider,
            manager,
            translator,
            coordinator,
            result_mapper: ResultMapper::new(),
        }
    }

    /// Replace the sync kill-switch policy.
    pub fn with_sync_policy(mut self, policy: Arc<dyn SyncPolicy>) -> Self {
        self.coordinator = self.coordinator.with_policy(policy);
        self
    }

    /// Route a native query: translate it, execute it on the engine when
    /// eligible, and map the response back into native shape.
    ///
    /// Engine failures surface as `Native` fallbacks rather than empty
    /// result sets; the read path prefers availability over completeness.
    #[instrument(skip(self, request), fields(tenant = request.tenant, kind = %request.kind))]
    pub async fn translate_and_execute(&self, request: &QueryRequest) -> QueryOutcome {
        let search_request = match self.translator.translate(request) {
            Translation::Ineligible(reason) => {
                debug!(reason = %reason, "Query not delegated");
                return QueryOutcome::Native(reason);
            }
            Translation::Delegated(search_request) => search_request,
        };

        match self
            .provider
            .search(&search_request.indices, &search_request.body)
            .await
        {
            Ok(response) => {
                let set = self.result_mapper.map(response, &request.projection);
                debug!(total = set.total, returned = set.len(), "Delegated query served");
                QueryOutcome::Delegated(set)
            }
            Err(e) => {
                warn!(error = %e, "Delegated query failed, falling back to native execution");
                QueryOutcome::Native(FallbackReason::EngineFailed(e.to_string()))
            }
        }
    }

    /// Add a key to the queue's pending upsert set.
    pub fn enqueue(&self, queue: &mut SyncQueue, key: ContentKey) {
        queue.enqueue(key);
    }

    /// Feed a host-store mutation event into the queue.
    pub fn observe(&self, queue: &mut SyncQueue, event: &MutationEvent) {
        queue.observe(event);
    }

    /// Flush every pending entry in the given queue.
    pub async fn flush(&self, queue: &mut SyncQueue) -> FlushResult {
        self.coordinator.flush(queue).await
    }

    /// Ensure the index behind a tenant/kind pair exists.
    pub async fn ensure_index(
        &self,
        tenant: u64,
        kind: ContentKind,
    ) -> Result<IndexDescriptor, EngineError> {
        self.manager.ensure_index(tenant, kind).await
    }

    /// Apply the deployed mapping; see [`IndexManager::put_mapping`] for
    /// the idempotence and conflict rules.
    pub async fn put_mapping(&self, tenant: u64, kind: ContentKind) -> Result<(), EngineError> {
        self.manager.put_mapping(tenant, kind).await
    }

    /// Migrate the index to the deployed mapping version via alias swap.
    /// The caller re-syncs afterwards.
    pub async fn migrate_index(
        &self,
        tenant: u64,
        kind: ContentKind,
    ) -> Result<IndexDescriptor, EngineError> {
        self.manager.migrate_index(tenant, kind).await
    }

    /// Delete the index behind a tenant/kind pair.
    pub async fn delete_index(&self, tenant: u64, kind: ContentKind) -> Result<(), EngineError> {
        self.manager.delete_index(tenant, kind).await
    }
}
