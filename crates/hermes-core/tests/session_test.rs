// End-to-end session tests against a local WebSocket controller.
#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hermes_core::{
    CoreError, EntityId, LinkEvent, LinkState, Overrides, ReconnectConfig, Session, SessionConfig,
};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn config(addr: SocketAddr) -> SessionConfig {
    let mut config = SessionConfig::new(&format!("ws://{addr}/")).unwrap();
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_retries: Some(5),
    };
    config.connect_timeout = Some(WAIT);
    config
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .unwrap()
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn push(ws: &mut WebSocketStream<TcpStream>, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

fn handshake(boards: Value, devices: Value) -> Value {
    json!({
        "event": "handshake",
        "data": {
            "config": { "server": { "host": "0.0.0.0", "port": 9999 } },
            "profile": { "name": "rover", "description": "four wheels" },
            "boards": boards,
            "devices": devices,
            "groups": [
                { "id": 1, "name": "Lights", "parent": 0, "layout": "SimpleLayout", "order": 0,
                  "content": [{ "board": 1, "device": 7, "order": 0 }] }
            ]
        }
    })
}

fn led() -> Value {
    json!({
        "board": 1,
        "name": "lamp",
        "actions": [
            { "id": 3, "name": "light", "controller": "OnOffCommand", "pin": 13, "state": false }
        ]
    })
}

async fn wait_until(session: &Session, check: impl Fn(&Session) -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check(session) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_patch_and_dispatch() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await["event"], "handshake");
        push(
            &mut ws,
            handshake(json!({ "1": { "model": "ArduinoBoard", "name": "uno" } }), json!({ "7": led() })),
        )
        .await;

        // The UI asks for a change; the controller confirms with a patch.
        let action = next_json(&mut ws).await;
        assert_eq!(
            action,
            json!({ "event": "action", "data": { "device_id": 7, "command_id": 3, "value": true } })
        );
        push(
            &mut ws,
            json!({ "event": "patch", "data": { "device_id": 7, "patch": {
                "actions": [{ "id": 3, "state": true }]
            } } }),
        )
        .await;

        // Keep the socket open until the client hangs up.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = Session::new(config(addr));
    session.connect().await.unwrap();
    assert_eq!(session.state(), LinkState::Connected);

    wait_until(&session, |s| s.store().device_count() == 1).await;
    let store = session.store();
    assert_eq!(store.profile().name, "rover");
    assert_eq!(store.children_of(EntityId::ROOT).len(), 1);
    let status = session.connection_status();
    assert!(status.connected);
    assert_eq!(status.server.unwrap().port, Some(9999));

    let dispatcher = session.dispatcher();
    let mut description =
        dispatcher.watch_description(EntityId::new(7), EntityId::new(3), Overrides::default());
    assert_eq!(
        description.current().unwrap().tooltip,
        "Board \"uno\" (PIN 13): off"
    );

    assert!(dispatcher.dispatch(EntityId::new(7), EntityId::new(3), json!(true)));

    let updated = tokio::time::timeout(WAIT, description.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.feedback, "PIN 13: on");
    let device = store.device(EntityId::new(7)).unwrap();
    assert_eq!(device.name.as_deref(), Some("lamp"));

    session.disconnect().await;
    assert_eq!(session.state(), LinkState::Disconnected);
    assert!(!session.connection_status().connected);
    // Store contents survive a disconnect.
    assert_eq!(session.store().device_count(), 1);

    tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_refreshes_and_prunes() {
    let (listener, addr) = bind().await;
    let (close_tx, close_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        next_json(&mut ws).await;
        push(
            &mut ws,
            handshake(
                json!({ "1": { "model": "ArduinoBoard" }, "2": { "model": "ArduinoBoard" } }),
                json!({ "7": led() }),
            ),
        )
        .await;
        close_rx.await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // Second connection: board 2 is gone.
        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await["event"], "handshake");
        push(
            &mut ws,
            handshake(json!({ "1": { "model": "ArduinoBoard" } }), json!({ "7": led() })),
        )
        .await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = Session::new(config(addr));
    let mut events = session.subscribe_events();
    session.connect().await.unwrap();

    wait_until(&session, |s| s.store().board_count() == 2).await;
    close_tx.send(()).unwrap();

    // The drop is observed, then the link comes back.
    let mut seen = Vec::new();
    while !matches!(seen.last(), Some(LinkEvent::Connected) if seen.contains(&LinkEvent::Disconnected))
    {
        let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
        seen.push((*event).clone());
    }

    wait_until(&session, |s| s.store().board_count() == 1).await;
    assert!(session.store().board(EntityId::new(2)).is_none());
    assert_eq!(session.store().device_count(), 1);
    assert!(session.connection_status().connected);

    session.disconnect().await;
    tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connect_times_out_when_nothing_listens() {
    // Bind then drop to get a port with no listener behind it.
    let (listener, addr) = bind().await;
    drop(listener);

    let mut config = config(addr);
    config.connect_timeout = Some(Duration::from_millis(100));
    config.reconnect.max_retries = None;

    let session = Session::new(config);
    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, CoreError::ConnectionFailed { .. }), "{err:?}");
    assert_eq!(session.state(), LinkState::Disconnected);
    assert!(!session.send(EntityId::new(1), EntityId::new(1), json!(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gives_up_after_retry_budget() {
    let (listener, addr) = bind().await;
    drop(listener);

    let mut config = config(addr);
    config.reconnect.max_retries = Some(2);

    let err = Session::new(config).connect().await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectionLost { attempts: 2 }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connects_start_one_link() {
    let (listener, addr) = bind().await;
    let mut config = config(addr);
    config.connect_timeout = None;

    let session = Session::new(config);
    let (first, second) = tokio::join!(session.connect(), session.connect());
    first.unwrap();
    second.unwrap();

    let mut ws = accept(&listener).await;
    assert_eq!(next_json(&mut ws).await["event"], "handshake");
    let again = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(again.is_err(), "a second link dialed the controller");

    session.disconnect().await;
}
