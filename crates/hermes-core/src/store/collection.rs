// ── Generic reactive entity collection ──
//
// Lock-free concurrent storage with O(1) lookups and push-based
// change notification via `watch` channels.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Entity, EntityId};

/// A lock-free, reactive collection for a single entity class.
///
/// Uses `DashMap` for O(1) concurrent lookups and `watch` channels
/// for push-based change notification. Every mutation bumps a version
/// counter and rebuilds the snapshot that subscribers receive before
/// returning, so observers never see a half-applied change.
pub(crate) struct EntityCollection<T: Entity> {
    by_id: DashMap<EntityId, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot sorted by id, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Entity> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or fully replace an entity. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, entity: T) -> bool {
        let is_new = self.by_id.insert(entity.id(), Arc::new(entity)).is_none();
        self.publish();
        is_new
    }

    /// Remove an entity. Returns it if it existed.
    pub(crate) fn remove(&self, id: EntityId) -> Option<Arc<T>> {
        let removed = self.by_id.remove(&id).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<Arc<T>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Remove all entities.
    pub(crate) fn clear(&self) {
        self.by_id.clear();
        self.publish();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Upsert `items` and drop every id not among them, publishing once.
    ///
    /// Returns the pruned ids.
    pub(crate) fn replace_all(&self, items: Vec<T>) -> Vec<EntityId> {
        let incoming: HashSet<EntityId> = items.iter().map(Entity::id).collect();
        for entity in items {
            self.by_id.insert(entity.id(), Arc::new(entity));
        }
        let pruned: Vec<EntityId> = self
            .ids()
            .into_iter()
            .filter(|id| !incoming.contains(id))
            .collect();
        for id in &pruned {
            self.by_id.remove(id);
        }
        self.publish();
        pruned
    }

    pub(crate) fn ids(&self) -> Vec<EntityId> {
        self.by_id.iter().map(|r| *r.key()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the sorted snapshot, broadcast it, and bump the version.
    fn publish(&self) {
        let mut values: Vec<Arc<T>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by_key(|v| v.id());
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Board;

    fn board(id: u64, model: &str) -> Board {
        Board::new(EntityId::new(id), model)
    }

    #[test]
    fn upsert_reports_new_ids() {
        let col: EntityCollection<Board> = EntityCollection::new();
        assert!(col.upsert(board(1, "ArduinoBoard")));
        assert!(!col.upsert(board(1, "OtherBoard")));
        assert_eq!(col.get(EntityId::new(1)).unwrap().model, "OtherBoard");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn remove_returns_entity_once() {
        let col: EntityCollection<Board> = EntityCollection::new();
        col.upsert(board(1, "ArduinoBoard"));

        assert!(col.remove(EntityId::new(1)).is_some());
        assert!(col.remove(EntityId::new(1)).is_none());
        assert!(col.get(EntityId::new(1)).is_none());
        assert!(col.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let col: EntityCollection<Board> = EntityCollection::new();
        for id in [5, 1, 3] {
            col.upsert(board(id, "x"));
        }
        let ids: Vec<u64> = col.snapshot().iter().map(|b| b.id.get()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn every_mutation_publishes() {
        let col: EntityCollection<Board> = EntityCollection::new();
        let mut rx = col.subscribe();
        assert_eq!(col.version(), 0);

        col.upsert(board(1, "x"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        // Removing a missing id is not a mutation.
        col.remove(EntityId::new(9));
        assert!(!rx.has_changed().unwrap());

        col.clear();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn replace_all_publishes_once() {
        let col: EntityCollection<Board> = EntityCollection::new();
        col.upsert(board(1, "x"));
        col.upsert(board(2, "x"));
        let mut rx = col.subscribe();
        rx.borrow_and_update();
        let before = col.version();

        let pruned = col.replace_all(vec![board(2, "y"), board(3, "y")]);

        assert_eq!(pruned, vec![EntityId::new(1)]);
        assert_eq!(col.version(), before + 1);
        let ids: Vec<u64> = rx.borrow_and_update().iter().map(|b| b.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
