//! Connection manager.
//!
//! One background driver task owns the socket for the manager's lifetime.
//! The driver walks `Connecting -> Connected -> Reconnecting` and back,
//! routes inbound frames, and writes outbound frames queued by the gateway.
//! Everything the rest of the crate may observe lives in [`Shared`]:
//! - the [`LinkStatus`] watch (state + transport generation)
//! - the reconnect attempt counter
//! - the deliberate-shutdown flag
//!
//! Reconnect timers capture the generation they were scheduled under and do
//! nothing if it changed by the time they fire (`close()` and `reopen()` both
//! bump it).

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use wsnotify_core::error::{ClientError, Result};

use crate::gateway::{Outbound, OutboundGateway};
use crate::subscription::MessageRouter;
use crate::transport::{Connector, Link};

use super::{ConnectionState, LinkStatus, ReconnectPolicy};

enum Command {
    Reopen,
    Shutdown,
}

struct Shared {
    status: watch::Sender<LinkStatus>,
    attempts: AtomicU32,
    closed: AtomicBool,
}

impl Shared {
    fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Start a new transport generation in `Connecting`. `None` after shutdown.
    fn begin_attempt(&self) -> Option<u64> {
        let mut generation = None;
        self.status.send_if_modified(|s| {
            if self.is_closed() {
                return false;
            }
            s.generation += 1;
            s.state = ConnectionState::Connecting;
            generation = Some(s.generation);
            true
        });
        generation
    }

    /// Move to `state` only if `generation` is still current.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        self.status.send_if_modified(|s| {
            if s.generation != generation || self.is_closed() {
                return false;
            }
            s.state = state;
            true
        })
    }

    /// Deliberate shutdown. Returns false if already closed.
    fn shut_down(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.status.send_modify(|s| {
            s.generation += 1;
            s.state = ConnectionState::Disconnected;
        });
        true
    }
}

/// Owns one logical connection to one endpoint.
///
/// Created by [`ConnectionManager::open`], which must be called inside a
/// Tokio runtime. Dropping the manager closes it.
pub struct ConnectionManager {
    endpoint: Arc<str>,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    outbound: mpsc::UnboundedSender<Outbound>,
    router: MessageRouter,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start connecting to `endpoint`. The state is `Connecting` on return.
    pub fn open(
        endpoint: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
        router: MessageRouter,
    ) -> Self {
        let endpoint: Arc<str> = Arc::from(endpoint.into());
        let (status, _) = watch::channel(LinkStatus::default());
        let shared = Arc::new(Shared {
            status,
            attempts: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        });
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let first = shared.begin_attempt();

        let driver = Driver {
            endpoint: Arc::clone(&endpoint),
            connector,
            policy,
            router: router.clone(),
            shared: Arc::clone(&shared),
            commands: cmd_rx,
            outbound: out_rx,
        };
        let task = tokio::spawn(driver.run(first));

        Self {
            endpoint,
            shared,
            commands: cmd_tx,
            outbound: out_tx,
            router,
            task: Some(task),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.status().state
    }

    /// Side-effect-free connectivity snapshot.
    pub fn is_connected(&self) -> bool {
        self.shared.status().is_connected()
    }

    /// Reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::Acquire)
    }

    /// Observe state transitions without polling.
    pub fn watch_state(&self) -> watch::Receiver<LinkStatus> {
        self.shared.status.subscribe()
    }

    /// Gateway that writes through this manager's socket.
    pub fn gateway(&self) -> OutboundGateway {
        OutboundGateway::new(
            self.shared.status.subscribe(),
            self.outbound.clone(),
            Arc::clone(self.router.metrics()),
        )
    }

    /// Start a fresh connection cycle after the reconnect budget ran out.
    ///
    /// A no-op while a connection is live or an attempt is pending.
    pub fn reopen(&self) -> Result<()> {
        if self.shared.is_closed() {
            return Err(ClientError::Closed);
        }
        if self.state() != ConnectionState::Disconnected {
            tracing::debug!(endpoint = %self.endpoint, state = %self.state(), "reopen ignored");
            return Ok(());
        }
        self.commands
            .send(Command::Reopen)
            .map_err(|_| ClientError::Closed)
    }

    /// Deliberate shutdown: invalidates any pending reconnect timer, closes
    /// the socket, and leaves the manager `Disconnected` for good.
    pub fn close(&self) {
        if self.shared.shut_down() {
            tracing::info!(endpoint = %self.endpoint, "connection manager closing");
            let _ = self.commands.send(Command::Shutdown);
        }
    }

    /// `close()` and wait for the driver to release the socket.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

enum Phase {
    Connect(u64),
    Wait { delay: Duration, generation: u64 },
    Idle,
    Stop,
}

struct Driver {
    endpoint: Arc<str>,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    router: MessageRouter,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl Driver {
    async fn run(mut self, first: Option<u64>) {
        let mut phase = first.map_or(Phase::Stop, Phase::Connect);
        loop {
            phase = match phase {
                Phase::Connect(generation) => self.connect(generation).await,
                Phase::Wait { delay, generation } => self.wait(delay, generation).await,
                Phase::Idle => self.idle().await,
                Phase::Stop => break,
            };
        }
        tracing::debug!(endpoint = %self.endpoint, "connection driver stopped");
    }

    async fn connect(&mut self, generation: u64) -> Phase {
        tracing::info!(
            endpoint = %self.endpoint,
            attempt = self.shared.attempts.load(Ordering::Acquire),
            "connecting"
        );

        let connector = Arc::clone(&self.connector);
        let endpoint = Arc::clone(&self.endpoint);
        let attempt = connector.connect(&endpoint);
        let Some(result) = self.unless_shutdown(attempt).await else {
            return Phase::Stop;
        };

        match result {
            Ok(link) => {
                if !self.shared.transition(generation, ConnectionState::Connected) {
                    let Link { mut sink, .. } = link;
                    let _ = sink.close().await;
                    return self.after_stale();
                }
                self.on_opened();
                let phase = self.drive_link(link, generation).await;
                self.router.metrics().connected.set(&[], 0);
                phase
            }
            Err(e) => {
                self.report_transport_error(&e);
                self.on_closed(generation)
            }
        }
    }

    fn on_opened(&self) {
        self.shared.attempts.store(0, Ordering::Release);
        let metrics = self.router.metrics();
        metrics.connects.inc(&[]);
        metrics.connected.set(&[], 1);
        tracing::info!(endpoint = %self.endpoint, "connected");
        self.router.hooks().connected();
    }

    /// Pump one open link until it closes or the manager shuts down.
    async fn drive_link(&mut self, link: Link, generation: u64) -> Phase {
        let Link { mut sink, mut stream } = link;
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Reopen) => {}
                    Some(Command::Shutdown) | None => {
                        let _ = sink.close().await;
                        self.router.metrics().disconnects.inc(&[]);
                        tracing::info!(endpoint = %self.endpoint, "disconnected (shutdown)");
                        self.router.hooks().disconnected();
                        return Phase::Stop;
                    }
                },

                incoming = stream.next() => match incoming {
                    Some(Ok(text)) => {
                        self.router.dispatch(&text);
                    }
                    Some(Err(e)) => {
                        self.report_transport_error(&e);
                        return self.on_closed(generation);
                    }
                    None => return self.on_closed(generation),
                },

                out = self.outbound.recv() => {
                    let Some(out) = out else { continue };
                    if out.generation != generation {
                        self.router.metrics().frames_stale.inc(&[]);
                        tracing::debug!(frame_generation = out.generation, generation, "discarding frame for a closed connection");
                        continue;
                    }
                    if let Err(e) = sink.send(out.frame).await {
                        self.report_transport_error(&e);
                        return self.on_closed(generation);
                    }
                }
            }
        }
    }

    /// Transport reported "closed": schedule one reconnect or give up.
    fn on_closed(&mut self, generation: u64) -> Phase {
        if self.shared.is_closed() {
            return Phase::Stop;
        }

        self.router.metrics().disconnects.inc(&[]);
        self.router.hooks().disconnected();

        let attempt = self.shared.attempts.load(Ordering::Acquire);
        match self.policy.delay_for(attempt) {
            Some(delay) => {
                if !self.shared.transition(generation, ConnectionState::Reconnecting) {
                    return self.after_stale();
                }
                tracing::warn!(
                    endpoint = %self.endpoint,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "connection lost; reconnect scheduled"
                );
                Phase::Wait { delay, generation }
            }
            None => {
                self.shared.transition(generation, ConnectionState::Disconnected);
                tracing::warn!(
                    endpoint = %self.endpoint,
                    max_attempts = self.policy.max_attempts(),
                    "reconnect attempts exhausted; staying disconnected"
                );
                Phase::Idle
            }
        }
    }

    /// One pending reconnect timer.
    async fn wait(&mut self, delay: Duration, generation: u64) -> Phase {
        if self.unless_shutdown(tokio::time::sleep(delay)).await.is_none() {
            return Phase::Stop;
        }

        let status = self.shared.status();
        if status.generation != generation || status.state != ConnectionState::Reconnecting {
            tracing::debug!(generation, current = status.generation, "stale reconnect timer ignored");
            return self.after_stale();
        }

        let attempt = self.shared.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        self.router.metrics().reconnect_attempts.inc(&[]);
        tracing::debug!(endpoint = %self.endpoint, attempt, "reconnect timer fired");

        match self.shared.begin_attempt() {
            Some(next) => Phase::Connect(next),
            None => Phase::Stop,
        }
    }

    /// Out of attempts: wait for the host to reopen or close.
    async fn idle(&mut self) -> Phase {
        match self.commands.recv().await {
            Some(Command::Reopen) => {
                self.shared.attempts.store(0, Ordering::Release);
                tracing::info!(endpoint = %self.endpoint, "reopen requested");
                match self.shared.begin_attempt() {
                    Some(next) => Phase::Connect(next),
                    None => Phase::Stop,
                }
            }
            Some(Command::Shutdown) | None => Phase::Stop,
        }
    }

    fn after_stale(&self) -> Phase {
        if self.shared.is_closed() {
            Phase::Stop
        } else {
            Phase::Idle
        }
    }

    fn report_transport_error(&self, err: &ClientError) {
        self.router.metrics().transport_errors.inc(&[]);
        tracing::error!(endpoint = %self.endpoint, error = %err, "transport error");
        self.router.hooks().error(err);
    }

    /// Run `fut` unless a shutdown command arrives first. Reopen requests
    /// received meanwhile are ignored.
    async fn unless_shutdown<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        let mut fut = pin!(fut);
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Reopen) => continue,
                    Some(Command::Shutdown) | None => return None,
                },
                out = &mut fut => return Some(out),
            }
        }
    }
}
