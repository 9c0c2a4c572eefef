// ── Full snapshot application ──
//
// Applies the controller's handshake dump into the DataStore.

use chrono::Utc;

use super::DataStore;
use super::collection::EntityCollection;
use super::groups;
use crate::error::CoreError;
use crate::model::{Board, Device, Entity, Group, Profile};

/// Upsert all incoming entities and prune ids absent from them, publishing
/// one snapshot per collection. Observers never see an empty or half-applied
/// collection.
fn upsert_and_prune<T: Entity>(collection: &EntityCollection<T>, items: Vec<T>) {
    for id in collection.replace_all(items) {
        tracing::debug!(kind = T::KIND, %id, "pruned entity absent from snapshot");
    }
}

/// Everything the controller pushes in one handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakeSnapshot {
    pub profile: Profile,
    pub boards: Vec<Board>,
    pub devices: Vec<Device>,
    pub groups: Vec<Group>,
}

impl DataStore {
    /// Replace the store contents with a full controller snapshot.
    ///
    /// Uses upsert-then-prune per collection. A group tree containing a
    /// cycle is refused as a whole (the previous groups stay) while boards,
    /// devices and the profile are still applied.
    pub fn apply_handshake(&self, snapshot: HandshakeSnapshot) -> Result<(), CoreError> {
        let HandshakeSnapshot {
            profile,
            boards,
            devices,
            groups,
        } = snapshot;

        upsert_and_prune(&self.boards, boards);
        upsert_and_prune(&self.devices, devices);
        self.profile.send_replace(profile);
        self.last_handshake.send_replace(Some(Utc::now()));

        self.replace_groups(groups)
    }

    /// Replace the whole group tree, refusing it if it contains a cycle.
    pub fn replace_groups(&self, groups: Vec<Group>) -> Result<(), CoreError> {
        if let Some(group) = groups::find_cycle(&groups) {
            return Err(CoreError::GroupCycle {
                group: group.id,
                parent: group.parent,
            });
        }
        upsert_and_prune(&self.groups, groups);
        Ok(())
    }
}
