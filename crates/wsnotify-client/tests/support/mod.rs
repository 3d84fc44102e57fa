//! Helpers shared by the client integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use wsnotify_client::{ClientConfig, ConnectionState, Hooks, LinkStatus, LoopbackConnector, NotifyClient};

pub const ENDPOINT: &str = "ws://loopback.test/ws";

pub fn client(connector: &LoopbackConnector, hooks: Hooks) -> NotifyClient {
    client_with(ClientConfig::new(ENDPOINT), connector, hooks)
}

pub fn client_with(cfg: ClientConfig, connector: &LoopbackConnector, hooks: Hooks) -> NotifyClient {
    NotifyClient::connect_with(&cfg, connector.clone(), hooks).expect("client must start")
}

/// Poll `cond` every 10ms (virtual time under `start_paused`).
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

pub async fn wait_state(rx: &mut watch::Receiver<LinkStatus>, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(300), rx.wait_for(|s| s.state == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .expect("manager dropped");
}

pub fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

pub fn assert_about(actual: Duration, expected: Duration) {
    let diff = if actual > expected { actual - expected } else { expected - actual };
    assert!(
        diff <= Duration::from_millis(20),
        "expected ~{expected:?}, got {actual:?}"
    );
}
