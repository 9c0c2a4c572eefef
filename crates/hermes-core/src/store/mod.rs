// ── Reactive data store ──
//
// Lock-free entity storage with push-based change notification.

mod collection;
mod data_store;
mod groups;
mod refresh;

pub use data_store::{BoardRef, DataStore};
pub use groups::GroupChildren;
pub use refresh::HandshakeSnapshot;
