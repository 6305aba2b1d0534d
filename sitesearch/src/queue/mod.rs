//! Sync queue.
//!
//! A per-request-lifecycle set of content keys awaiting (re)indexing.
//! The queue is an explicit object: the host constructs it at request
//! start, feeds it mutation events, and flushes it at a checkpoint
//! through the sync coordinator. Membership is what matters: entries
//! are deduplicated and insertion order is irrelevant; iteration order
//! is the deterministic key order of the underlying sets.

use std::collections::BTreeSet;

use sitesearch_shared::{ContentKey, ContentRecord, MutationAction, MutationEvent};

/// Kill-switch predicate consulted per item immediately before mapping.
///
/// Lets the host veto syncing specific records (unindexable statuses,
/// excluded content) without touching queue mechanics.
pub trait SyncPolicy: Send + Sync {
    fn should_index(&self, record: &ContentRecord) -> bool;
}

/// The default policy: index everything the store returns.
pub struct AllowAll;

impl SyncPolicy for AllowAll {
    fn should_index(&self, _record: &ContentRecord) -> bool {
        true
    }
}

/// Pending sync state for one request lifecycle.
#[derive(Debug, Default)]
pub struct SyncQueue {
    upserts: BTreeSet<ContentKey>,
    deletes: BTreeSet<ContentKey>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the pending upsert set. Re-enqueueing an already
    /// pending key is a no-op.
    pub fn enqueue(&mut self, key: ContentKey) {
        self.deletes.remove(&key);
        self.upserts.insert(key);
    }

    /// Add a key to the pending delete set.
    pub fn enqueue_delete(&mut self, key: ContentKey) {
        self.upserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Handle a typed mutation event from the host store.
    ///
    /// A later event for the same key wins: update-after-delete revives
    /// the upsert, delete-after-update cancels it.
    pub fn observe(&mut self, event: &MutationEvent) {
        match event.action {
            MutationAction::Created | MutationAction::Updated => self.enqueue(event.key),
            MutationAction::Deleted => self.enqueue_delete(event.key),
        }
    }

    /// Number of pending entries across both sets.
    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn contains(&self, key: &ContentKey) -> bool {
        self.upserts.contains(key) || self.deletes.contains(key)
    }

    /// Take every pending upsert, in key order, leaving the set empty.
    pub(crate) fn drain_upserts(&mut self) -> Vec<ContentKey> {
        std::mem::take(&mut self.upserts).into_iter().collect()
    }

    /// Take every pending delete, in key order, leaving the set empty.
    pub(crate) fn drain_deletes(&mut self) -> Vec<ContentKey> {
        std::mem::take(&mut self.deletes).into_iter().collect()
    }
}

/// A single failed sync item.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedSync {
    pub key: ContentKey,
    pub reason: String,
}

/// Outcome of one flush.
///
/// Failed keys are reported here and forgotten by the queue; they are
/// not auto-retried. The caller decides whether to re-enqueue them.
#[derive(Debug, Clone, Default)]
pub struct FlushResult {
    pub upserted: Vec<ContentKey>,
    pub deleted: Vec<ContentKey>,
    /// Keys vetoed by the sync policy or gone from the store by flush
    /// time.
    pub skipped: Vec<ContentKey>,
    pub failed: Vec<FailedSync>,
}

impl FlushResult {
    /// The keys that failed to sync.
    pub fn failed_keys(&self) -> Vec<ContentKey> {
        self.failed.iter().map(|f| f.key).collect()
    }

    /// Whether every pending entry synced (or was legitimately skipped).
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn fail(&mut self, key: ContentKey, reason: impl Into<String>) {
        self.failed.push(FailedSync {
            key,
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesearch_shared::ContentKind;

    fn key(id: u64) -> ContentKey {
        ContentKey::new(1, ContentKind::Post, id)
    }

    #[test]
    fn test_enqueue_deduplicates() {
        let mut queue = SyncQueue::new();
        queue.enqueue(key(5));
        queue.enqueue(key(5));
        queue.enqueue(key(5));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_upserts(), vec![key(5)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_is_key_ordered() {
        let mut queue = SyncQueue::new();
        queue.enqueue(key(9));
        queue.enqueue(key(2));
        queue.enqueue(ContentKey::new(1, ContentKind::Comment, 1));

        let drained = queue.drain_upserts();
        assert_eq!(
            drained,
            vec![key(2), key(9), ContentKey::new(1, ContentKind::Comment, 1)]
        );
    }

    #[test]
    fn test_observe_latest_action_wins() {
        let mut queue = SyncQueue::new();

        queue.observe(&MutationEvent::updated(key(3)));
        queue.observe(&MutationEvent::deleted(key(3)));
        assert_eq!(queue.drain_upserts(), Vec::<ContentKey>::new());
        assert_eq!(queue.drain_deletes(), vec![key(3)]);

        queue.observe(&MutationEvent::deleted(key(4)));
        queue.observe(&MutationEvent::created(key(4)));
        assert_eq!(queue.drain_upserts(), vec![key(4)]);
        assert!(queue.drain_deletes().is_empty());
    }

    #[test]
    fn test_flush_result_failed_keys() {
        let mut result = FlushResult::default();
        result.fail(key(4), "mapper_parsing_exception");

        assert!(!result.is_clean());
        assert_eq!(result.failed_keys(), vec![key(4)]);
    }
}
