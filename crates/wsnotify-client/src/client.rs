//! Assembled client: one connection manager plus the registry, router and
//! gateway wired around it.
//!
//! The host constructs a `NotifyClient` explicitly (typically at startup),
//! hands references to consumers, and shuts it down explicitly. There is no
//! ambient global instance.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use wsnotify_core::error::Result;
use wsnotify_core::Envelope;

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState, LinkStatus};
use crate::gateway::OutboundGateway;
use crate::hooks::Hooks;
use crate::obs::ClientMetrics;
use crate::subscription::{MessageRouter, Subscription, SubscriptionRegistry};
use crate::transport::{Connector, WsConnector};

pub struct NotifyClient {
    manager: ConnectionManager,
    registry: SubscriptionRegistry,
    gateway: OutboundGateway,
    metrics: Arc<ClientMetrics>,
}

impl NotifyClient {
    /// Validate `cfg` and start connecting over WebSocket.
    pub fn connect(cfg: &ClientConfig, hooks: Hooks) -> Result<Self> {
        Self::connect_with(cfg, WsConnector::new(), hooks)
    }

    /// Validate `cfg` and start connecting through `connector`.
    pub fn connect_with<C: Connector>(cfg: &ClientConfig, connector: C, hooks: Hooks) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(ClientMetrics::new());
        let registry = SubscriptionRegistry::new();
        let router = MessageRouter::new(registry.clone(), hooks, Arc::clone(&metrics));
        let manager = ConnectionManager::open(
            cfg.endpoint.clone(),
            Arc::new(connector),
            cfg.reconnect_policy(),
            router,
        );
        let gateway = manager.gateway();

        tracing::info!(endpoint = %cfg.endpoint, "notify client started");

        Ok(Self {
            manager,
            registry,
            gateway,
            metrics,
        })
    }

    /// Typed view of one message type.
    pub fn channel(&self, msg_type: &str) -> Channel {
        Channel::new(msg_type, self.registry.clone(), self.gateway.clone())
    }

    /// Call `handler(content, envelope)` for every inbound `msg_type` envelope.
    ///
    /// Use [`NotifyClient::channel`] with [`Channel::on_error`] to get
    /// handler failures reported per consumer.
    pub fn subscribe<F>(&self, msg_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Value, &Envelope) -> Result<()> + Send + Sync + 'static,
    {
        self.channel(msg_type).subscribe(handler)
    }

    /// Call `callback` for every inbound envelope, whatever its type.
    pub fn listen<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Envelope) -> Result<()> + Send + Sync + 'static,
    {
        self.registry.register(callback)
    }

    /// Send `content` as a `msg_type` envelope. Fails with `NotConnected`
    /// unless the connection is live.
    pub fn send(&self, msg_type: &str, content: Value) -> Result<()> {
        self.gateway.send(Envelope::new(msg_type, content))
    }

    /// Send a caller-built envelope (custom sender, timestamp or extra fields).
    pub fn send_envelope(&self, env: Envelope) -> Result<()> {
        self.gateway.send(env)
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkStatus> {
        self.manager.watch_state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.manager.reconnect_attempts()
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Restart connecting after the reconnect budget was exhausted.
    pub fn reopen(&self) -> Result<()> {
        self.manager.reopen()
    }

    /// Close the connection for good. Subscriptions stay registered but will
    /// not receive anything further.
    pub fn close(&self) {
        self.manager.close();
    }

    /// Close and wait until the socket has been released.
    pub async fn shutdown(self) {
        self.manager.shutdown().await;
    }
}
