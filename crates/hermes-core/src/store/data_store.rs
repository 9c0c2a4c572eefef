// ── Central reactive data store ──
//
// Thread-safe, lock-free storage for boards, devices and groups.
// Mutations are broadcast to subscribers via `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::EntityCollection;
use super::groups::{self, GroupChildren};
use crate::error::CoreError;
use crate::model::{Board, Device, EntityId, Group, Profile};
use crate::stream::EntityStream;

/// Where a device's `board` reference points.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardRef {
    Resolved(Arc<Board>),
    /// The referenced board is not in the store.
    Unknown(EntityId),
}

impl BoardRef {
    pub fn board(&self) -> Option<&Arc<Board>> {
        match self {
            Self::Resolved(board) => Some(board),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

/// Central reactive store for all Hermes domain entities.
///
/// Reads are wait-free snapshots; writes use fine-grained per-shard locks
/// within `DashMap`. In a running session the bridge task is the only
/// writer.
pub struct DataStore {
    pub(crate) boards: EntityCollection<Board>,
    pub(crate) devices: EntityCollection<Device>,
    pub(crate) groups: EntityCollection<Group>,
    pub(crate) profile: watch::Sender<Profile>,
    pub(crate) last_handshake: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (profile, _) = watch::channel(Profile::default());
        let (last_handshake, _) = watch::channel(None);
        let (last_push, _) = watch::channel(None);

        Self {
            boards: EntityCollection::new(),
            devices: EntityCollection::new(),
            groups: EntityCollection::new(),
            profile,
            last_handshake,
            last_push,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert or replace a board. Returns `true` if it was new.
    pub fn upsert_board(&self, board: Board) -> bool {
        self.boards.upsert(board)
    }

    /// Insert or replace a device. Returns `true` if it was new.
    pub fn upsert_device(&self, device: Device) -> bool {
        self.devices.upsert(device)
    }

    /// Insert or replace a group, refusing any parent that closes a cycle.
    pub fn upsert_group(&self, group: Group) -> Result<bool, CoreError> {
        if groups::creates_cycle(&self.groups.snapshot(), &group) {
            return Err(CoreError::GroupCycle {
                group: group.id,
                parent: group.parent,
            });
        }
        Ok(self.groups.upsert(group))
    }

    /// Remove a board. Devices pointing at it are left dangling.
    pub fn remove_board(&self, id: EntityId) -> Option<Arc<Board>> {
        self.boards.remove(id)
    }

    pub fn remove_device(&self, id: EntityId) -> Option<Arc<Device>> {
        self.devices.remove(id)
    }

    /// Remove a group. Its children keep their (now dangling) parent.
    pub fn remove_group(&self, id: EntityId) -> Option<Arc<Group>> {
        self.groups.remove(id)
    }

    /// Drop every entity and reset the profile.
    pub fn clear(&self) {
        self.boards.clear();
        self.devices.clear();
        self.groups.clear();
        self.profile.send_replace(Profile::default());
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn boards_snapshot(&self) -> Arc<Vec<Arc<Board>>> {
        self.boards.snapshot()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn groups_snapshot(&self) -> Arc<Vec<Arc<Group>>> {
        self.groups.snapshot()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn board(&self, id: EntityId) -> Option<Arc<Board>> {
        self.boards.get(id)
    }

    pub fn device(&self, id: EntityId) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    pub fn group(&self, id: EntityId) -> Option<Arc<Group>> {
        self.groups.get(id)
    }

    /// Groups whose parent is `parent`, ordered by `order` then id.
    pub fn children_of(&self, parent: EntityId) -> GroupChildren {
        GroupChildren::new(parent, self.groups.snapshot())
    }

    /// Resolve a device's owning board.
    pub fn board_for(&self, device: &Device) -> BoardRef {
        self.boards
            .get(device.board)
            .map_or(BoardRef::Unknown(device.board), BoardRef::Resolved)
    }

    /// Devices whose board is not in the store.
    pub fn dangling_devices(&self) -> Vec<Arc<Device>> {
        self.devices
            .snapshot()
            .iter()
            .filter(|d| !self.boards.contains(d.board))
            .cloned()
            .collect()
    }

    /// Devices attached to `board`, in id order.
    pub fn devices_on(&self, board: EntityId) -> Vec<Arc<Device>> {
        self.devices
            .snapshot()
            .iter()
            .filter(|d| d.board == board)
            .cloned()
            .collect()
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.devices.is_empty() && self.groups.is_empty()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_boards(&self) -> EntityStream<Board> {
        EntityStream::new(self.boards.subscribe())
    }

    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }

    pub fn subscribe_groups(&self) -> EntityStream<Group> {
        EntityStream::new(self.groups.subscribe())
    }

    pub fn subscribe_profile(&self) -> watch::Receiver<Profile> {
        self.profile.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn profile(&self) -> Profile {
        self.profile.borrow().clone()
    }

    pub fn last_handshake(&self) -> Option<DateTime<Utc>> {
        *self.last_handshake.borrow()
    }

    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        *self.last_push.borrow()
    }

    /// Record that an inbound message was applied.
    pub(crate) fn touch(&self) {
        self.last_push.send_replace(Some(Utc::now()));
    }

    /// How long ago the last full handshake was applied, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_handshake().map(|t| Utc::now() - t)
    }

    /// Combined mutation counter across all collections.
    pub fn version(&self) -> u64 {
        self.boards.version() + self.devices.version() + self.groups.version()
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
