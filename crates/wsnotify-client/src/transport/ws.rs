//! WebSocket connector over `tokio-tungstenite`.
//!
//! Text frames only: binary frames are ignored, ping/pong is answered by
//! tungstenite itself, and a close frame ends the inbound stream.

use async_trait::async_trait;
use futures_util::{future, stream, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use wsnotify_core::error::{ClientError, Result};

use super::{Connector, Link};

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link> {
        let (socket, _resp) = connect_async(endpoint)
            .await
            .map_err(ClientError::transport)?;

        let (ws_tx, ws_rx) = socket.split();

        let sink = ws_tx
            .sink_map_err(ClientError::transport)
            .with(|text: String| future::ready(Ok::<_, ClientError>(Message::Text(text.into()))));

        let stream = stream::unfold(ws_rx, |mut rx| async move {
            loop {
                match rx.next().await? {
                    Ok(Message::Text(text)) => return Some((Ok(text.as_str().to_owned()), rx)),
                    Ok(Message::Close(_)) => return None,
                    Ok(Message::Binary(b)) => {
                        tracing::debug!(bytes_len = b.len(), "ignoring binary frame");
                    }
                    // ping/pong/raw frames
                    Ok(_) => {}
                    Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                    Err(e) => return Some((Err(ClientError::transport(e)), rx)),
                }
            }
        });

        Ok(Link::new(Box::pin(sink), Box::pin(stream)))
    }
}
