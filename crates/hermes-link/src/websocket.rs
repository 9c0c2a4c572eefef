//! Bidirectional WebSocket link with auto-reconnect.
//!
//! Connects to the hardware controller, publishes decoded [`ServerEvent`]s
//! and lifecycle transitions through a [`tokio::sync::broadcast`] channel,
//! and writes outbound [`ClientEvent`]s while connected. Reconnection is
//! driven by a [`SessionMachine`] with exponential backoff + jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_link::{Link, ReconnectConfig, parse_endpoint};
//! use tokio_util::sync::CancellationToken;
//!
//! let link = Link::new(parse_endpoint("ws://robot.local:9999/socket")?, ReconnectConfig::default());
//! let mut rx = link.subscribe();
//! let handle = link.spawn(CancellationToken::new());
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::reconnect::{LinkState, ReconnectConfig, SessionMachine, Step};

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported for a close frame without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

// ── LinkEvent ────────────────────────────────────────────────────────

/// Everything observable on the link: lifecycle transitions and
/// decoded controller messages, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay: Duration },
    ReconnectFailed { attempt: u32, reason: String },
    GivenUp { attempts: u32 },
    Message(ServerEvent),
}

// ── Endpoint validation ──────────────────────────────────────────────

/// Parse and validate a controller endpoint. Only `ws` and `wss` are accepted.
pub fn parse_endpoint(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw)?;
    check_scheme(&url)?;
    Ok(url)
}

fn check_scheme(url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(Error::UnsupportedScheme {
            scheme: other.to_owned(),
        }),
    }
}

// ── Link (not yet running) ───────────────────────────────────────────

/// A configured but not yet started link.
///
/// Subscribe before calling [`spawn`](Self::spawn) to observe every event,
/// including the first `Connected`.
pub struct Link {
    url: Url,
    reconnect: ReconnectConfig,
    event_tx: broadcast::Sender<Arc<LinkEvent>>,
    state_tx: watch::Sender<LinkState>,
    state_rx: watch::Receiver<LinkState>,
    outbound_tx: mpsc::Sender<ClientEvent>,
    outbound_rx: mpsc::Receiver<ClientEvent>,
}

impl Link {
    pub fn new(url: Url, reconnect: ReconnectConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        Self {
            url,
            reconnect,
            event_tx,
            state_tx,
            state_rx,
            outbound_tx,
            outbound_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LinkEvent>> {
        self.event_tx.subscribe()
    }

    /// Spawn the connection loop. Returns immediately; the first connection
    /// attempt happens asynchronously.
    pub fn spawn(self, cancel: CancellationToken) -> LinkHandle {
        let handle = LinkHandle {
            outbound_tx: self.outbound_tx,
            event_tx: self.event_tx.clone(),
            state_rx: self.state_rx,
            cancel: cancel.clone(),
        };

        let task = LinkTask {
            url: self.url,
            machine: SessionMachine::new(self.reconnect),
            outbound_rx: self.outbound_rx,
            event_tx: self.event_tx,
            state_tx: self.state_tx,
            cancel,
        };
        tokio::spawn(link_loop(task));

        handle
    }
}

// ── LinkHandle ───────────────────────────────────────────────────────

/// Handle to a running link. Cheap to clone.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`Link::spawn`]) to tear down the background task.
#[derive(Clone)]
pub struct LinkHandle {
    outbound_tx: mpsc::Sender<ClientEvent>,
    event_tx: broadcast::Sender<Arc<LinkEvent>>,
    state_rx: watch::Receiver<LinkState>,
    cancel: CancellationToken,
}

impl LinkHandle {
    /// Validate `url`, then build and spawn a link in one step.
    pub fn connect(
        url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        check_scheme(&url)?;
        Ok(Link::new(url, reconnect).spawn(cancel))
    }

    /// New receiver for link events. Only sees events published after
    /// this call. A slow consumer gets [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LinkEvent>> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> LinkState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    /// Queue `event` for transmission.
    ///
    /// Fire-and-forget: returns `false` when the message was dropped because
    /// the link is not connected or the outbound queue is full. Nothing is
    /// buffered for a future connection.
    pub fn send(&self, event: ClientEvent) -> bool {
        let state = self.state();
        if !state.is_connected() {
            tracing::debug!(%state, ?event, "link not connected, dropping outbound message");
            return false;
        }

        match self.outbound_tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "outbound queue rejected message");
                false
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background connection loop ───────────────────────────────────────

struct LinkTask {
    url: Url,
    machine: SessionMachine,
    outbound_rx: mpsc::Receiver<ClientEvent>,
    event_tx: broadcast::Sender<Arc<LinkEvent>>,
    state_tx: watch::Sender<LinkState>,
    cancel: CancellationToken,
}

impl LinkTask {
    fn publish_state(&self, state: LinkState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: LinkEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(Arc::new(event));
    }

    /// Drop anything queued for the connection that just went away.
    fn discard_pending(&mut self) {
        let mut dropped: usize = 0;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded outbound messages from closed connection");
        }
    }
}

/// How a connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    Cancelled,
    /// Every [`LinkHandle`] was dropped, so nothing can use the link.
    Orphaned,
}

/// Main loop: connect → exchange frames → on failure, backoff → reconnect.
async fn link_loop(mut task: LinkTask) {
    loop {
        if task.outbound_rx.is_closed() {
            tracing::debug!("all link handles dropped, not reconnecting");
            break;
        }

        let state = task.machine.begin();
        task.publish_state(state);

        let result = connect_and_run(&mut task).await;
        task.discard_pending();

        if task.cancel.is_cancelled() {
            break;
        }
        let reason = match result {
            Ok(ended) => {
                tracing::debug!(?ended, "link ended");
                break;
            }
            Err(e) => e.to_string(),
        };

        let was_connected = task.machine.state().is_connected();

        if was_connected {
            tracing::warn!(%reason, "controller link lost");
            task.emit(LinkEvent::Disconnected);
        } else if let LinkState::Reconnecting { attempt } = state {
            tracing::warn!(%reason, attempt, "reconnect attempt failed");
            task.emit(LinkEvent::ReconnectFailed { attempt, reason });
        } else {
            tracing::warn!(%reason, "initial connection failed");
        }

        match task.machine.failed() {
            Step::Retry { attempt, delay } => {
                task.publish_state(task.machine.state());
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before reconnect"
                );
                task.emit(LinkEvent::Reconnecting { attempt, delay });

                tokio::select! {
                    biased;
                    () = task.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Step::GiveUp { attempts } => {
                task.publish_state(LinkState::GivenUp);
                tracing::error!(attempts, "reconnection budget exhausted, giving up");
                task.emit(LinkEvent::GivenUp { attempts });
                return;
            }
        }
    }

    let was_connected = task.machine.state().is_connected();
    let state = task.machine.reset();
    task.publish_state(state);
    if was_connected {
        task.emit(LinkEvent::Disconnected);
    }
    tracing::debug!("link loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one connection and pump frames both ways until it drops.
///
/// Returns `Ok` on local cancellation or when every handle is gone; both
/// end the link for good.
async fn connect_and_run(task: &mut LinkTask) -> Result<Ended, Error> {
    tracing::info!(url = %task.url, "connecting to controller");

    let connecting = tokio_tungstenite::connect_async(task.url.as_str());
    let (ws_stream, _response) = tokio::select! {
        biased;
        () = task.cancel.cancelled() => return Ok(Ended::Cancelled),
        result = connecting => result.map_err(|e| Error::WebSocketConnect(e.to_string()))?,
    };

    let state = task.machine.connected();
    task.publish_state(state);
    task.emit(LinkEvent::Connected);
    tracing::info!("controller link established");

    let (mut write, mut read) = ws_stream.split();

    // A fresh connection always starts from a full state dump.
    write_event(&mut write, &ClientEvent::Handshake).await?;

    loop {
        tokio::select! {
            biased;
            () = task.cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(Ended::Cancelled);
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch_frame(text.as_str(), &task.event_tx),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (NO_STATUS_RECEIVED, String::new()),
                        |cf| (u16::from(cf.code), cf.reason.as_str().to_owned()),
                    );
                    tracing::info!(code, %reason, "close frame received");
                    return Err(Error::WebSocketClosed { code, reason });
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol.
                    tracing::trace!("ignoring non-text frame");
                }
                Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                None => {
                    return Err(Error::WebSocketClosed {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".into(),
                    });
                }
            },
            outbound = task.outbound_rx.recv() => match outbound {
                Some(event) => write_event(&mut write, &event).await?,
                None => {
                    tracing::debug!("all link handles dropped, closing connection");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(Ended::Orphaned);
                }
            },
        }
    }
}

async fn write_event<S>(sink: &mut S, event: &ClientEvent) -> Result<(), Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = event.encode()?;
    tracing::trace!(%frame, "sending frame");
    sink.send(Message::Text(frame.into()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Frame decoding ───────────────────────────────────────────────────

/// Decode a text frame and broadcast it. Undecodable frames are skipped.
fn dispatch_frame(text: &str, event_tx: &broadcast::Sender<Arc<LinkEvent>>) {
    match ServerEvent::decode(text) {
        Ok(event) => {
            tracing::trace!(event = event.name(), "frame received");
            let _ = event_tx.send(Arc::new(LinkEvent::Message(event)));
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable frame");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
