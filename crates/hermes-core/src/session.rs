// ── Session ──
//
// Full lifecycle of one controller connection: spawns the link, bridges
// inbound messages into the DataStore in arrival order, tracks connection
// status and routes outbound commands.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hermes_link::{ClientEvent, Link, LinkEvent, LinkHandle, LinkState, ServerEvent};

use crate::config::SessionConfig;
use crate::convert;
use crate::dispatch::{CommandDispatcher, CommandSink, merge_device_patch};
use crate::error::CoreError;
use crate::model::{ConnectionStatus, EntityId};
use crate::registry::Registries;
use crate::store::DataStore;

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Session ─────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Does not connect on
/// construction; call [`connect()`](Self::connect).
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<DataStore>,
    registries: Arc<Registries>,
    status: watch::Sender<ConnectionStatus>,
    link_state: watch::Sender<LinkState>,
    event_tx: broadcast::Sender<Arc<LinkEvent>>,
    cancel: CancellationToken,
    /// Child token for the current connection; cancelled on disconnect,
    /// replaced on connect.
    cancel_child: Mutex<CancellationToken>,
    /// Read synchronously by `send`, so it lives outside the async mutexes.
    link: ArcSwapOption<LinkHandle>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registries(config, Registries::builtin())
    }

    /// Session resolving kinds through custom registries.
    pub fn with_registries(config: SessionConfig, registries: Registries) -> Self {
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let (status, _) = watch::channel(ConnectionStatus::disconnected());
        let (link_state, _) = watch::channel(LinkState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(SessionInner {
                config,
                store: Arc::new(DataStore::new()),
                registries: Arc::new(registries),
                status,
                link_state,
                event_tx,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                link: ArcSwapOption::empty(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.inner.registries
    }

    /// Dispatcher sending through this session.
    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.registries),
            Arc::new(self.clone()),
        )
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Start the link and the bridge task.
    ///
    /// With a `connect_timeout` configured, waits for the first connection
    /// and fails if it does not come up in time. Otherwise returns at once
    /// and the link keeps trying in the background.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;

        {
            // Held until the handle is stored so concurrent callers start one link.
            let mut cancel_child = self.inner.cancel_child.lock().await;
            if self.inner.link.load().is_some() {
                debug!("session already started");
                return Ok(());
            }

            // Fresh child token for this connection (supports reconnect).
            let child = self.inner.cancel.child_token();
            *cancel_child = child.clone();

            let link = Link::new(config.url.clone(), config.reconnect.clone());
            let link_rx = link.subscribe();
            let handle = link.spawn(child.clone());

            let mut handles = self.inner.task_handles.lock().await;
            handles.push(self.spawn_bridge(&handle, link_rx, child.clone()));
            handles.push(self.spawn_state_mirror(&handle, child.clone()));
            if let Some(interval) = config.ping_interval {
                handles.push(spawn_keepalive(handle.clone(), interval, child));
            }
            drop(handles);

            self.inner.link.store(Some(Arc::new(handle)));
        }
        info!(url = %config.url, "session started");

        let Some(timeout) = config.connect_timeout else {
            return Ok(());
        };

        let mut state_rx = self.inner.link_state.subscribe();
        let outcome = tokio::time::timeout(
            timeout,
            state_rx.wait_for(|s| s.is_connected() || matches!(s, LinkState::GivenUp)),
        )
        .await
        .map(|reached| reached.map(|state| *state));

        let failure = match outcome {
            Ok(Ok(LinkState::Connected)) => return Ok(()),
            Ok(Ok(_)) => CoreError::ConnectionLost {
                attempts: config.reconnect.max_retries.unwrap_or_default(),
            },
            Ok(Err(_)) => CoreError::Internal("link state channel closed".into()),
            Err(_) => CoreError::ConnectionFailed {
                url: config.url.to_string(),
                reason: format!("no connection within {}s", timeout.as_secs_f32()),
            },
        };

        self.disconnect().await;
        Err(failure)
    }

    /// Bridge task: link events → store mutations → session broadcast.
    fn spawn_bridge(
        &self,
        handle: &LinkHandle,
        mut link_rx: broadcast::Receiver<Arc<LinkEvent>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.inner.store);
        let status = self.inner.status.clone();
        let event_tx = self.inner.event_tx.clone();
        let handle = handle.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = link_rx.recv() => {
                        match result {
                            Ok(event) => {
                                apply_link_event(&store, &status, &event);
                                let _ = event_tx.send(event);
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "bridge lagged, requesting a fresh snapshot");
                                handle.send(ClientEvent::Handshake);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        })
    }

    /// Mirror the current link's state into the session-level watch so
    /// observers survive reconnects.
    fn spawn_state_mirror(&self, handle: &LinkHandle, cancel: CancellationToken) -> JoinHandle<()> {
        let mut rx = handle.watch_state();
        let link_state = self.inner.link_state.clone();

        tokio::spawn(async move {
            loop {
                let state = *rx.borrow_and_update();
                link_state.send_replace(state);

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Stop the link and background tasks. Store contents are kept.
    pub async fn disconnect(&self) {
        // Cancel the child token (not the parent, allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        if let Some(handle) = self.inner.link.swap(None) {
            handle.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.link_state.send_replace(LinkState::Disconnected);
        self.inner.status.send_modify(|s| s.connected = false);
        debug!("disconnected");
    }

    /// One-shot: connect, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: SessionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let session = Session::new(config);
        session.connect().await?;
        let result = f(session.clone()).await;
        session.disconnect().await;
        result
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Fire-and-forget command. Dropped (returns `false`) while not connected.
    pub fn send(&self, device_id: EntityId, command_id: EntityId, value: Value) -> bool {
        self.send_event(ClientEvent::Action {
            device_id: device_id.get(),
            command_id: command_id.get(),
            value,
        })
    }

    /// Keepalive ping, answered by a `pong`.
    pub fn ping(&self) -> bool {
        self.send_event(ClientEvent::Ping)
    }

    /// Ask the controller to push a full snapshot again.
    pub fn request_snapshot(&self) -> bool {
        self.send_event(ClientEvent::Handshake)
    }

    fn send_event(&self, event: ClientEvent) -> bool {
        match self.inner.link.load().as_deref() {
            Some(handle) => handle.send(event),
            None => {
                debug!(?event, "session not started, dropping outbound message");
                false
            }
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        *self.inner.link_state.borrow()
    }

    /// Subscribe to link state changes.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.inner.link_state.subscribe()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Link events, delivered after the store has applied them.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<LinkEvent>> {
        self.inner.event_tx.subscribe()
    }
}

impl CommandSink for Session {
    fn send_action(&self, device_id: EntityId, command_id: EntityId, value: Value) -> bool {
        self.send(device_id, command_id, value)
    }
}

fn spawn_keepalive(
    handle: LinkHandle,
    every: std::time::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    handle.send(ClientEvent::Ping);
                }
            }
        }
    })
}

// ── Inbound application ─────────────────────────────────────────────

fn apply_link_event(store: &DataStore, status: &watch::Sender<ConnectionStatus>, event: &LinkEvent) {
    match event {
        LinkEvent::Connected => {
            status.send_if_modified(|s| !std::mem::replace(&mut s.connected, true));
        }
        LinkEvent::Disconnected | LinkEvent::GivenUp { .. } => {
            status.send_if_modified(|s| std::mem::replace(&mut s.connected, false));
        }
        LinkEvent::Reconnecting { .. } | LinkEvent::ReconnectFailed { .. } => {}
        LinkEvent::Message(message) => {
            match apply_server_event(store, status, message) {
                Ok(()) => store.touch(),
                Err(e) => warn!(event = message.name(), error = %e, "inbound message not applied"),
            }
        }
    }
}

/// Apply one controller message to the store.
pub(crate) fn apply_server_event(
    store: &DataStore,
    status: &watch::Sender<ConnectionStatus>,
    event: &ServerEvent,
) -> Result<(), CoreError> {
    match event {
        ServerEvent::Handshake(payload) => {
            let (server, web) = convert::server_settings(&payload.config);
            status.send_modify(|s| {
                s.server = server;
                s.web = web;
            });

            let snapshot = convert::handshake_snapshot(payload.clone());
            let (boards, devices, groups) = (
                snapshot.boards.len(),
                snapshot.devices.len(),
                snapshot.groups.len(),
            );
            store.apply_handshake(snapshot)?;
            info!(boards, devices, groups, "handshake applied");
        }
        ServerEvent::Patch { device_id, patch } => {
            let id = EntityId::new(*device_id);
            let existing = store.device(id);
            let merged = merge_device_patch(existing.as_deref(), id, patch)?;
            store.upsert_device(merged);
        }
        ServerEvent::Board { board } => {
            let board = convert::board_from_value(board.clone())?;
            debug!(board = %board.id, "board announced");
            store.upsert_board(board);
        }
        ServerEvent::BoardRemoved { board_id } => {
            if store.remove_board(EntityId::new(*board_id)).is_none() {
                debug!(board_id, "removal of unknown board");
            }
        }
        ServerEvent::DeviceRemoved { device_id } => {
            if store.remove_device(EntityId::new(*device_id)).is_none() {
                debug!(device_id, "removal of unknown device");
            }
        }
        ServerEvent::Groups { groups } => {
            store.replace_groups(convert::groups_from_values(groups.clone()))?;
        }
        ServerEvent::Pong => {
            tracing::trace!("pong");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Board, Device};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn status() -> watch::Sender<ConnectionStatus> {
        watch::channel(ConnectionStatus::disconnected()).0
    }

    fn message(frame: Value) -> ServerEvent {
        serde_json::from_value(frame).unwrap()
    }

    #[test]
    fn handshake_fills_store_and_status() {
        let store = DataStore::new();
        let status = status();
        let event = message(json!({
            "event": "handshake",
            "data": {
                "config": { "server": { "port": 9999 }, "web": { "enabled": true } },
                "profile": { "name": "arm", "description": "six axis" },
                "boards": { "1": { "model": "ArduinoBoard" } },
                "devices": { "7": { "board": 1 } },
                "groups": []
            }
        }));

        apply_server_event(&store, &status, &event).unwrap();

        assert_eq!(store.board_count(), 1);
        assert_eq!(store.device_count(), 1);
        assert_eq!(store.profile().description, "six axis");
        assert_eq!(status.borrow().server.as_ref().unwrap().port, Some(9999));
        assert_eq!(status.borrow().web.as_ref().unwrap().enabled, Some(true));
    }

    #[test]
    fn patch_merges_into_stored_device() {
        let store = DataStore::new();
        let mut device = Device::new(EntityId::new(7), EntityId::new(1));
        device.name = Some("lamp".into());
        store.upsert_device(device);

        let event = message(json!({
            "event": "patch",
            "data": { "device_id": 7, "patch": { "state": "on" } }
        }));
        apply_server_event(&store, &status(), &event).unwrap();

        let stored = store.device(EntityId::new(7)).unwrap();
        assert_eq!(stored.name.as_deref(), Some("lamp"));
        assert_eq!(stored.state, json!("on"));
    }

    #[test]
    fn removals_do_not_cascade() {
        let store = DataStore::new();
        store.upsert_board(Board::new(EntityId::new(1), "ArduinoBoard"));
        store.upsert_device(Device::new(EntityId::new(7), EntityId::new(1)));

        let event = message(json!({ "event": "board_removed", "data": { "board_id": 1 } }));
        apply_server_event(&store, &status(), &event).unwrap();

        assert_eq!(store.board_count(), 0);
        assert_eq!(store.dangling_devices().len(), 1);

        // Unknown ids are a no-op.
        let event = message(json!({ "event": "device_removed", "data": { "device_id": 42 } }));
        apply_server_event(&store, &status(), &event).unwrap();
        assert_eq!(store.device_count(), 1);
    }

    #[test]
    fn cyclic_groups_are_rejected() {
        let store = DataStore::new();
        let event = message(json!({
            "event": "groups",
            "data": { "groups": [
                { "id": 1, "parent": 2, "layout": "SimpleLayout", "order": 0, "content": [] },
                { "id": 2, "parent": 1, "layout": "SimpleLayout", "order": 0, "content": [] }
            ]}
        }));

        let err = apply_server_event(&store, &status(), &event).unwrap_err();
        assert!(matches!(err, CoreError::GroupCycle { .. }));
        assert_eq!(store.group_count(), 0);
    }

    #[test]
    fn lifecycle_events_drive_connected_flag() {
        let store = DataStore::new();
        let status = status();
        let mut rx = status.subscribe();

        apply_link_event(&store, &status, &LinkEvent::Connected);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().connected);

        // Repeated Connected does not notify.
        apply_link_event(&store, &status, &LinkEvent::Connected);
        assert!(!rx.has_changed().unwrap());

        apply_link_event(&store, &status, &LinkEvent::Disconnected);
        assert!(!rx.borrow_and_update().connected);
    }

    #[test]
    fn bad_message_does_not_touch_store() {
        let store = DataStore::new();
        let event = LinkEvent::Message(message(json!({
            "event": "patch",
            "data": { "device_id": 7, "patch": 5 }
        })));

        apply_link_event(&store, &status(), &event);
        assert!(store.last_push().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn send_before_connect_is_dropped() {
        let session = Session::new(SessionConfig::default());
        assert_eq!(session.state(), LinkState::Disconnected);
        assert!(!session.send(EntityId::new(7), EntityId::new(3), json!(true)));
        assert!(!session.ping());
        assert!(!session.connection_status().connected);
    }
}
