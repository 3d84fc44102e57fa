//! End-to-end over a real WebSocket against a local echo server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};

use wsnotify_client::{ClientConfig, ConnectionState, Hooks, NotifyClient};
use wsnotify_core::ErrorKind;

async fn echo_upgrade(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(echo)
}

async fn echo(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn spawn_echo_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/ws", get(echo_upgrade));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("echo server failed");
    });
    addr
}

async fn wait_for(client: &NotifyClient, state: ConnectionState) {
    let mut rx = client.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .unwrap();
}

#[tokio::test]
async fn ping_round_trips_through_echo_server() {
    let addr = spawn_echo_server().await;
    let cfg = ClientConfig::new(format!("ws://{addr}/ws"));
    let client = NotifyClient::connect(&cfg, Hooks::new()).unwrap();
    wait_for(&client, ConnectionState::Connected).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
    let _sub = client.subscribe("ping", move |content, _env| {
        let _ = tx.send(content.clone());
        Ok(())
    });

    client.send("ping", json!({ "seq": 42 })).unwrap();
    let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no echo")
        .unwrap();
    assert_eq!(got["seq"], 42);

    client.shutdown().await;
}

#[tokio::test]
async fn refused_endpoint_schedules_reconnect() {
    // grab a free port, then release it so nothing listens there
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let errors = Arc::new(Mutex::new(Vec::new()));
    let hooks = {
        let errors = errors.clone();
        Hooks::new().on_error(move |e| errors.lock().push(e.kind()))
    };
    let cfg = ClientConfig::new(format!("ws://{addr}/ws"));
    let client = NotifyClient::connect(&cfg, hooks).unwrap();

    wait_for(&client, ConnectionState::Reconnecting).await;
    assert_eq!(errors.lock().first(), Some(&ErrorKind::Transport));
    assert!(!client.is_connected());

    client.shutdown().await;
}
