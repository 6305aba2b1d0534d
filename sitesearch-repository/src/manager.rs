//! Index lifecycle management.
//!
//! The index manager owns per-tenant per-kind index creation, mapping
//! application, alias/version resolution, migration, and deletion. It
//! never silently drops data: a mapping change against a non-empty index
//! surfaces as [`EngineError::MappingConflict`] and requires an explicit
//! migration.

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::EngineError;
use crate::interfaces::SearchEngineProvider;
use crate::opensearch::mappings::{
    index_alias, index_body, mapping_body, versioned_index_name, MAPPING_VERSION,
};
use sitesearch_shared::ContentKind;

/// Resolved index identity for one `(tenant, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub tenant: u64,
    pub kind: ContentKind,
    /// Stable logical name callers address; repointed during migration.
    pub alias: String,
    /// Concrete versioned index behind the alias at the current mapping
    /// generation.
    pub index_name: String,
    pub mapping_version: u32,
}

/// Owns index lifecycle for every `(tenant, kind)` pair under one name
/// prefix.
#[derive(Clone)]
pub struct IndexManager {
    provider: Arc<dyn SearchEngineProvider>,
    prefix: String,
}

impl IndexManager {
    pub fn new(provider: Arc<dyn SearchEngineProvider>, prefix: impl Into<String>) -> Self {
        Self {
            provider,
            prefix: prefix.into(),
        }
    }

    /// Resolve the descriptor for a tenant/kind pair. Pure name
    /// computation; no engine round-trip.
    pub fn resolve(&self, tenant: u64, kind: ContentKind) -> IndexDescriptor {
        let alias = index_alias(&self.prefix, tenant, kind);
        let index_name = versioned_index_name(&alias, MAPPING_VERSION);
        IndexDescriptor {
            tenant,
            kind,
            alias,
            index_name,
            mapping_version: MAPPING_VERSION,
        }
    }

    /// Create the index (with mappings and alias) if the alias does not
    /// resolve yet; no-op otherwise.
    pub async fn ensure_index(
        &self,
        tenant: u64,
        kind: ContentKind,
    ) -> Result<IndexDescriptor, EngineError> {
        let descriptor = self.resolve(tenant, kind);

        if !self.provider.index_exists(&descriptor.alias).await? {
            self.provider
                .create_index(
                    &descriptor.index_name,
                    &index_body(kind, Some(&descriptor.alias)),
                )
                .await?;
            info!(
                alias = %descriptor.alias,
                index = %descriptor.index_name,
                "Created index"
            );
        }

        Ok(descriptor)
    }

    /// Apply the deployed mapping to an existing index.
    ///
    /// Idempotent: re-applying an unchanged mapping is a no-op. A changed
    /// mapping is re-applied in place only when the index is empty;
    /// otherwise the call fails with `MappingConflict` and the caller
    /// must run [`IndexManager::migrate_index`] plus a full re-sync.
    pub async fn put_mapping(&self, tenant: u64, kind: ContentKind) -> Result<(), EngineError> {
        let descriptor = self.resolve(tenant, kind);

        match self.provider.mapping_version(&descriptor.alias).await? {
            None => {
                self.ensure_index(tenant, kind).await?;
                Ok(())
            }
            Some(version) if version == MAPPING_VERSION => {
                debug!(alias = %descriptor.alias, version, "Mapping already current");
                Ok(())
            }
            Some(version) => {
                let count = self.provider.count_documents(&descriptor.alias).await?;
                if count == 0 {
                    self.provider
                        .put_mapping(&descriptor.alias, &mapping_body(kind))
                        .await?;
                    info!(
                        alias = %descriptor.alias,
                        from = version,
                        to = MAPPING_VERSION,
                        "Re-applied mapping to empty index"
                    );
                    Ok(())
                } else {
                    Err(EngineError::mapping_conflict(format!(
                        "index {} holds {} documents at mapping version {} (deployed version {}); \
                         migrate the index and re-sync",
                        descriptor.alias, count, version, MAPPING_VERSION
                    )))
                }
            }
        }
    }

    /// Migrate an alias to a fresh index at the deployed mapping version:
    /// create the new versioned index, atomically swap the alias, delete
    /// the old index.
    ///
    /// Documents are not copied; they are regenerable from the source
    /// store, so the caller re-syncs after migrating.
    pub async fn migrate_index(
        &self,
        tenant: u64,
        kind: ContentKind,
    ) -> Result<IndexDescriptor, EngineError> {
        let descriptor = self.resolve(tenant, kind);

        let old_version = self.provider.mapping_version(&descriptor.alias).await?;
        let old_index = match old_version {
            None => {
                // Nothing to migrate from; plain creation.
                return self.ensure_index(tenant, kind).await;
            }
            Some(version) if version == MAPPING_VERSION => {
                debug!(alias = %descriptor.alias, version, "Index already at deployed version");
                return Ok(descriptor);
            }
            Some(version) => versioned_index_name(&descriptor.alias, version),
        };

        self.provider
            .create_index(&descriptor.index_name, &index_body(kind, None))
            .await?;
        self.provider
            .swap_alias(&descriptor.alias, Some(&old_index), &descriptor.index_name)
            .await?;
        self.provider.delete_index(&old_index).await?;

        info!(
            alias = %descriptor.alias,
            old_index = %old_index,
            new_index = %descriptor.index_name,
            "Migrated index; a full re-sync is required"
        );

        Ok(descriptor)
    }

    /// Delete the index behind a tenant/kind alias.
    pub async fn delete_index(&self, tenant: u64, kind: ContentKind) -> Result<(), EngineError> {
        let descriptor = self.resolve(tenant, kind);

        // Resolve the concrete index through its recorded version so a
        // not-yet-migrated index is still deletable.
        let index_name = match self.provider.mapping_version(&descriptor.alias).await? {
            Some(version) => versioned_index_name(&descriptor.alias, version),
            None => return Ok(()),
        };

        self.provider.delete_index(&index_name).await
    }
}
