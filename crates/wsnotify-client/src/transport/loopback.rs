//! In-memory connector for tests and offline hosts.
//!
//! Every `connect` opens a fresh in-process link. The handle can refuse
//! connects, inject inbound frames, drop or fail the current link, and
//! records every attempt and every written frame.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use wsnotify_core::error::{ClientError, Result};

use super::{Connector, Link};

enum PeerEvent {
    Frame(String),
    Drop,
    Fail(String),
}

#[derive(Default)]
struct LoopbackInner {
    echo: AtomicBool,
    refuse: AtomicU32,
    attempts: Mutex<Vec<Instant>>,
    written: Mutex<Vec<String>>,
    peer: Mutex<Option<mpsc::UnboundedSender<PeerEvent>>>,
}

/// Scriptable in-memory peer. Clones share state.
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    inner: Arc<LoopbackInner>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo every written frame back as an inbound frame.
    pub fn echo(self) -> Self {
        self.inner.echo.store(true, Ordering::SeqCst);
        self
    }

    /// Refuse the next `n` connect attempts.
    pub fn refuse_next(&self, n: u32) {
        self.inner.refuse.store(n, Ordering::SeqCst);
    }

    /// Refuse every connect attempt until `refuse_next(0)`.
    pub fn refuse_all(&self) {
        self.refuse_next(u32::MAX);
    }

    pub fn connect_count(&self) -> usize {
        self.inner.attempts.lock().len()
    }

    /// When each connect attempt happened.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.inner.attempts.lock().clone()
    }

    /// Every frame written by the client, across all links.
    pub fn written(&self) -> Vec<String> {
        self.inner.written.lock().clone()
    }

    /// Deliver `frame` on the current link. Returns false with no live link.
    pub fn push_frame(&self, frame: impl Into<String>) -> bool {
        self.to_peer(PeerEvent::Frame(frame.into()))
    }

    /// Close the current link from the remote side.
    pub fn drop_link(&self) -> bool {
        self.to_peer(PeerEvent::Drop)
    }

    /// Fail the current link with a transport error.
    pub fn fail_link(&self, reason: impl Into<String>) -> bool {
        self.to_peer(PeerEvent::Fail(reason.into()))
    }

    fn to_peer(&self, ev: PeerEvent) -> bool {
        self.inner
            .peer
            .lock()
            .as_ref()
            .map_or(false, |tx| tx.send(ev).is_ok())
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link> {
        self.inner.attempts.lock().push(Instant::now());

        let refused = self
            .inner
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ClientError::Transport(format!("connection refused: {endpoint}")));
        }

        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        *self.inner.peer.lock() = Some(peer_tx.clone());

        let sink = sink::unfold(
            (Arc::clone(&self.inner), peer_tx),
            |(inner, peer_tx), frame: String| async move {
                inner.written.lock().push(frame.clone());
                if inner.echo.load(Ordering::SeqCst) {
                    let _ = peer_tx.send(PeerEvent::Frame(frame));
                }
                Ok::<_, ClientError>((inner, peer_tx))
            },
        );

        let stream = stream::unfold(peer_rx, |mut rx| async move {
            match rx.recv().await? {
                PeerEvent::Frame(text) => Some((Ok(text), rx)),
                PeerEvent::Drop => None,
                PeerEvent::Fail(reason) => Some((Err(ClientError::Transport(reason)), rx)),
            }
        });

        Ok(Link::new(Box::pin(sink), Box::pin(stream)))
    }
}
