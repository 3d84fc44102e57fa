//! Transport layer (WebSocket text frames).
//!
//! A [`Connector`] builds one [`Link`] per connection attempt. The link is
//! split into a frame sink and a frame stream so the connection driver can
//! read and write concurrently. The stream ending means "closed"; an `Err`
//! item means "error", which the driver follows with "closed".

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream};

use wsnotify_core::error::{ClientError, Result};

pub mod loopback;
pub mod ws;

pub use loopback::LoopbackConnector;
pub use ws::WsConnector;

/// Outbound half of a link: accepts encoded text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ClientError> + Send>>;

/// Inbound half of a link: yields text frames until the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One open transport.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Link {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Constructs a fresh transport bound to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Link>;
}
