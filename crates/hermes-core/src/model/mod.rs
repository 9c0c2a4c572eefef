// ── Domain model ──
//
// Canonical representation of everything the controller pushes. Records
// keep unknown fields so newer controller firmware round-trips cleanly.

pub mod board;
pub mod connection;
pub mod device;
pub mod entity_id;
pub mod group;
pub mod profile;

// ── Re-exports ──────────────────────────────────────────────────────

pub use board::Board;
pub use connection::{ConnectionStatus, ServerSettings};
pub use device::{Command, Device};
pub use entity_id::EntityId;
pub use group::{Group, GroupItem};
pub use profile::Profile;

/// Anything stored in an entity collection.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Entity class name, for logs and errors.
    const KIND: &'static str;

    fn id(&self) -> EntityId;
}

impl Entity for Board {
    const KIND: &'static str = "board";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Device {
    const KIND: &'static str = "device";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Group {
    const KIND: &'static str = "group";

    fn id(&self) -> EntityId {
        self.id
    }
}
