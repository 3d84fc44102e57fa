//! wsnotify client library entry.
//!
//! This crate wires the transport, connection manager, subscription registry,
//! router, outbound gateway and typed channels into one realtime notification
//! client. It is consumed by the binary (`main.rs`), by hosts, and by
//! integration tests.

pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod gateway;
pub mod hooks;
pub mod obs;
pub mod subscription;
pub mod transport;

pub use channel::Channel;
pub use client::NotifyClient;
pub use config::ClientConfig;
pub use connection::{ConnectionManager, ConnectionState, LinkStatus, ReconnectPolicy};
pub use gateway::OutboundGateway;
pub use hooks::Hooks;
pub use subscription::{DispatchOutcome, MessageRouter, Subscription, SubscriptionRegistry};
pub use transport::{Connector, Link, LoopbackConnector, WsConnector};
