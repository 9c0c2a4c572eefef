// ── Group tree helpers ──

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::{EntityId, Group};

/// Children of one parent group, ordered by `order` then id.
///
/// Holds a snapshot of the group collection taken when it was created;
/// filtering and sorting happen each time it is iterated, so it can be
/// walked any number of times and cloned freely.
#[derive(Debug, Clone)]
pub struct GroupChildren {
    parent: EntityId,
    groups: Arc<Vec<Arc<Group>>>,
}

impl GroupChildren {
    pub(crate) fn new(parent: EntityId, groups: Arc<Vec<Arc<Group>>>) -> Self {
        Self { parent, groups }
    }

    pub fn parent(&self) -> EntityId {
        self.parent
    }

    pub fn iter(&self) -> std::vec::IntoIter<Arc<Group>> {
        let mut children: Vec<Arc<Group>> = self
            .groups
            .iter()
            .filter(|g| g.parent == self.parent && g.id != self.parent)
            .cloned()
            .collect();
        children.sort_by_key(|g| (g.order, g.id));
        children.into_iter()
    }

    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.parent == self.parent && g.id != self.parent)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for &GroupChildren {
    type Item = Arc<Group>;
    type IntoIter = std::vec::IntoIter<Arc<Group>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walk the parent chain of `start` through `parents` and report whether it
/// reaches `target`. A missing parent ends the walk (dangling is tolerated).
///
/// `target` is compared before the root check: a group carrying the root id
/// can still close a loop through the sentinel.
fn chain_reaches(
    parents: &HashMap<EntityId, EntityId>,
    start: EntityId,
    target: EntityId,
) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = start;
    loop {
        if cursor == target {
            return true;
        }
        if cursor.is_root() || !seen.insert(cursor) {
            return false;
        }
        match parents.get(&cursor) {
            Some(next) => cursor = *next,
            None => return false,
        }
    }
}

/// Would inserting `candidate` into `existing` create a cycle?
pub(crate) fn creates_cycle(existing: &[Arc<Group>], candidate: &Group) -> bool {
    let mut parents: HashMap<EntityId, EntityId> =
        existing.iter().map(|g| (g.id, g.parent)).collect();
    parents.insert(candidate.id, candidate.parent);
    chain_reaches(&parents, candidate.parent, candidate.id)
}

/// First group in `groups` that sits on a cycle, if any.
pub(crate) fn find_cycle(groups: &[Group]) -> Option<&Group> {
    let parents: HashMap<EntityId, EntityId> = groups.iter().map(|g| (g.id, g.parent)).collect();
    groups
        .iter()
        .find(|g| chain_reaches(&parents, g.parent, g.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn group(id: u64, parent: u64, order: i64) -> Group {
        Group::new(EntityId::new(id), EntityId::new(parent), order)
    }

    fn snapshot(groups: Vec<Group>) -> Arc<Vec<Arc<Group>>> {
        Arc::new(groups.into_iter().map(Arc::new).collect())
    }

    #[test]
    fn children_sorted_by_order_then_id() {
        let children = GroupChildren::new(
            EntityId::ROOT,
            snapshot(vec![
                group(4, 0, 2),
                group(3, 0, 1),
                group(2, 0, 1),
                group(9, 4, 0),
            ]),
        );

        let ids: Vec<u64> = children.iter().map(|g| g.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn children_are_restartable() {
        let children = GroupChildren::new(EntityId::ROOT, snapshot(vec![group(1, 0, 0)]));
        let copy = children.clone();
        assert_eq!(children.iter().count(), 1);
        assert_eq!(children.iter().count(), 1);
        assert_eq!((&copy).into_iter().count(), 1);
    }

    #[test]
    fn detects_self_parent_and_indirect_cycles() {
        let existing: Vec<Arc<Group>> = vec![Arc::new(group(1, 0, 0)), Arc::new(group(2, 1, 0))];

        assert!(creates_cycle(&existing, &group(3, 3, 0)));
        // 1 -> 2 -> 1
        assert!(creates_cycle(&existing, &group(1, 2, 0)));
        assert!(!creates_cycle(&existing, &group(3, 2, 0)));
        // Dangling parent is tolerated.
        assert!(!creates_cycle(&existing, &group(3, 77, 0)));
    }

    #[test]
    fn cycle_through_the_root_id_is_detected() {
        let existing: Vec<Arc<Group>> = vec![Arc::new(group(5, 0, 0))];
        // 0 -> 5 -> 0
        assert!(creates_cycle(&existing, &group(0, 5, 0)));
        assert!(find_cycle(&[group(5, 0, 0), group(0, 5, 0)]).is_some());
        // Children of the root itself are fine.
        assert!(!creates_cycle(&existing, &group(6, 0, 0)));
    }

    #[test]
    fn find_cycle_in_batch() {
        let ok = vec![group(1, 0, 0), group(2, 1, 0)];
        assert!(find_cycle(&ok).is_none());

        let bad = vec![group(1, 3, 0), group(2, 1, 0), group(3, 2, 0)];
        assert!(find_cycle(&bad).is_some());
    }
}
