//! Outbound gateway: the only way frames reach the socket.
//!
//! A send either queues exactly one frame for the live connection or fails on
//! the spot. Nothing is buffered across disconnects: each frame is tagged
//! with the connection generation it was accepted under, and the connection
//! driver discards it if that connection is already gone.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use wsnotify_core::error::{ClientError, Result};
use wsnotify_core::protocol::text::encode_frame;
use wsnotify_core::Envelope;

use crate::connection::LinkStatus;
use crate::obs::ClientMetrics;

/// One encoded frame bound to the connection that accepted it.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub(crate) generation: u64,
    pub(crate) frame: String,
}

#[derive(Clone)]
pub struct OutboundGateway {
    status: watch::Receiver<LinkStatus>,
    tx: mpsc::UnboundedSender<Outbound>,
    metrics: Arc<ClientMetrics>,
}

impl OutboundGateway {
    pub(crate) fn new(
        status: watch::Receiver<LinkStatus>,
        tx: mpsc::UnboundedSender<Outbound>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            status,
            tx,
            metrics,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Validate, timestamp, encode and queue `env` for the live connection.
    ///
    /// Fails with `NotConnected` unless the manager is `Connected`, and with
    /// `InvalidEnvelope` for an empty `type`. Never retries.
    pub fn send(&self, mut env: Envelope) -> Result<()> {
        if let Err(e) = env.validate_outbound() {
            self.metrics.send_rejected.inc(&[("reason", "invalid_envelope")]);
            return Err(e);
        }

        let status = *self.status.borrow();
        if !status.is_connected() {
            self.metrics.send_rejected.inc(&[("reason", "not_connected")]);
            tracing::warn!(msg_type = %env.msg_type, state = %status.state, "send while not connected");
            return Err(ClientError::NotConnected);
        }

        env.stamp_if_missing();
        let frame = encode_frame(&env)?;

        self.tx
            .send(Outbound {
                generation: status.generation,
                frame,
            })
            .map_err(|_| ClientError::NotConnected)?;

        self.metrics.frames_out.inc(&[("msg_type", env.msg_type.as_str())]);
        tracing::debug!(msg_type = %env.msg_type, generation = status.generation, "frame queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::connection::ConnectionState;

    fn gateway(state: ConnectionState) -> (OutboundGateway, mpsc::UnboundedReceiver<Outbound>, watch::Sender<LinkStatus>) {
        let (status_tx, status_rx) = watch::channel(LinkStatus { state, generation: 7 });
        let (tx, rx) = mpsc::unbounded_channel();
        (OutboundGateway::new(status_rx, tx, Arc::new(ClientMetrics::new())), rx, status_tx)
    }

    #[test]
    fn refuses_when_not_connected() {
        for state in [ConnectionState::Disconnected, ConnectionState::Connecting, ConnectionState::Reconnecting] {
            let (gw, mut rx, _status) = gateway(state);
            let err = gw.send(Envelope::new("chat", json!("hi"))).unwrap_err();
            assert_eq!(err, ClientError::NotConnected, "state={state}");
            assert!(rx.try_recv().is_err(), "state={state}");
        }
    }

    #[test]
    fn stamps_and_tags_frame() {
        let (gw, mut rx, _status) = gateway(ConnectionState::Connected);
        gw.send(Envelope::new("chat", json!({ "text": "hi" }))).unwrap();

        let out = rx.try_recv().unwrap();
        assert_eq!(out.generation, 7);
        let v: serde_json::Value = serde_json::from_str(&out.frame).unwrap();
        assert_eq!(v["type"], "chat");
        assert!(!v["timestamp"].as_str().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn keeps_caller_timestamp() {
        let (gw, mut rx, _status) = gateway(ConnectionState::Connected);
        gw.send(Envelope::new("chat", json!(1)).with_timestamp("2024-01-01T00:00:00.000Z"))
            .unwrap();
        let out = rx.try_recv().unwrap();
        assert!(out.frame.contains("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn rejects_empty_type_even_when_connected() {
        let (gw, mut rx, _status) = gateway(ConnectionState::Connected);
        let err = gw.send(Envelope::new("", json!(1))).unwrap_err();
        assert_eq!(err.kind().as_str(), "INVALID_ENVELOPE");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn follows_state_changes() {
        let (gw, _rx, status) = gateway(ConnectionState::Connected);
        assert!(gw.is_connected());
        status.send_replace(LinkStatus { state: ConnectionState::Reconnecting, generation: 7 });
        assert!(!gw.is_connected());
        assert_eq!(gw.send(Envelope::new("chat", json!(1))), Err(ClientError::NotConnected));
    }
}
