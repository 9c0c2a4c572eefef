//! Reactive session core between a Hermes hardware controller and UI
//! consumers (CLI or a web front end).
//!
//! - **[`Session`]**: Central facade managing the connection lifecycle:
//!   [`connect()`](Session::connect) spawns the `hermes-link` WebSocket
//!   link and a bridge task that applies every inbound message to the
//!   [`DataStore`] in arrival order. [`Session::oneshot()`] wraps a single
//!   CLI invocation.
//!
//! - **[`DataStore`]**: Lock-free reactive storage built on
//!   `EntityCollection<T>` (`DashMap` + `tokio::sync::watch` channels) for
//!   boards, devices and the group tree.
//!
//! - **[`EntityStream<T>`]**: Subscription handle vended by the `DataStore`.
//!   Exposes `current()` / `latest()` / `changed()` for reactive rendering.
//!
//! - **[`Registries`]**: Kind tag → handler tables with a mandatory default,
//!   including the command controllers that derive label, tooltip and
//!   feedback texts.
//!
//! - **[`CommandDispatcher`]**: Fire-and-forget command routing plus live
//!   [`Description`]s. The store only changes when the controller confirms.
//!
//! - **[`BoundValue`]**: Two-way binding between externally supplied
//!   props and a local fallback.

pub mod binding;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use binding::{Authority, BoundValue, ExternalProps};
pub use config::{DEFAULT_ENDPOINT, SessionConfig};
pub use dispatch::{
    CommandDispatcher, CommandSink, Description, DescriptionStream, Overrides, merge_device_patch,
};
pub use error::CoreError;
pub use registry::{CommandController, Registries, TypeRegistry};
pub use session::Session;
pub use store::{BoardRef, DataStore, GroupChildren, HandshakeSnapshot};
pub use stream::EntityStream;

pub use hermes_link::{LinkEvent, LinkState, ReconnectConfig, ServerEvent};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Board, Command, ConnectionStatus, Device, Entity, EntityId, Group, GroupItem, Profile,
    ServerSettings,
};
