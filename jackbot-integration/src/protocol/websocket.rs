use crate::error::SocketError;
use futures::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A protocol-level websocket frame. Thin wrapper so callers never need to
/// depend on `tokio_tungstenite` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<WsMessage> for tokio_tungstenite::tungstenite::Message {
    fn from(value: WsMessage) -> Self {
        match value {
            WsMessage::Text(text) => Self::Text(text.into()),
            WsMessage::Binary(bytes) => Self::Binary(bytes.into()),
        }
    }
}

/// Connection-level timing configuration.
///
/// Defaults match spec: ping every ~20s, read timeout 30s, connect timeout 30s.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    pub read_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(20),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// A single websocket connection to one exchange endpoint.
///
/// Exclusively owned by a `Worker` (see `jackbot_data::worker`). Carries no
/// business logic: it connects, sends, receives and tracks the age of the
/// last received message. Failure (handshake rejection, mid-stream close,
/// read timeout) is reported by `connected` flipping to `false` - reacting
/// to that is the owning worker's job.
pub struct Connection {
    url: Url,
    config: ConnectionConfig,
    stream: Option<WsStream>,
    connected: bool,
    last_message_at: Instant,
}

impl Connection {
    pub fn new(url: Url, config: ConnectionConfig) -> Self {
        Self {
            url,
            config,
            stream: None,
            connected: false,
            last_message_at: Instant::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_message_age(&self) -> Duration {
        self.last_message_at.elapsed()
    }

    /// Establish the websocket handshake, bounded by `connect_timeout`.
    pub async fn connect(&mut self) -> Result<(), SocketError> {
        let attempt = connect_async(self.url.as_str());
        let (stream, _response) = tokio::time::timeout(self.config.connect_timeout, attempt)
            .await
            .map_err(|_| SocketError::ConnectTimeout(self.config.connect_timeout))??;

        self.stream = Some(stream);
        self.connected = true;
        self.last_message_at = Instant::now();
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
        self.connected = false;
    }

    pub async fn send(&mut self, message: WsMessage) -> Result<(), SocketError> {
        let Some(stream) = self.stream.as_mut() else {
            self.connected = false;
            return Err(SocketError::ConnectTimeout(Duration::ZERO));
        };

        if let Err(error) = stream.send(message.into()).await {
            self.connected = false;
            return Err(error.into());
        }
        Ok(())
    }

    /// Await the next inbound text frame, transparently answering pings and
    /// swallowing pongs/control frames. Applies the keep-alive ping on its
    /// own interval and the read timeout from [`ConnectionConfig`].
    ///
    /// Returns `Ok(None)` on a graceful close, `Err` on any failure - both
    /// flip `connected` to `false` first so callers can check it eagerly.
    pub async fn recv_text(&mut self) -> Result<Option<String>, SocketError> {
        use tokio_tungstenite::tungstenite::Message;

        loop {
            let Some(stream) = self.stream.as_mut() else {
                self.connected = false;
                return Ok(None);
            };

            let next = tokio::time::timeout(self.config.read_timeout, stream.next());
            let frame = match next.await {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(error))) => {
                    self.connected = false;
                    return Err(error.into());
                }
                Ok(None) => {
                    self.connected = false;
                    return Ok(None);
                }
                Err(_) => {
                    self.connected = false;
                    return Err(SocketError::ReadTimeout(self.config.read_timeout));
                }
            };

            self.last_message_at = Instant::now();

            match frame {
                Message::Text(text) => return Ok(Some(text.to_string())),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Message::Ping(payload) => {
                    if let Some(stream) = self.stream.as_mut() {
                        let _ = stream.send(Message::Pong(payload)).await;
                    }
                }
                Message::Pong(_) => debug!(url = %self.url, "received pong"),
                Message::Close(frame) => {
                    warn!(url = %self.url, ?frame, "received close frame");
                    self.connected = false;
                    return Ok(None);
                }
                Message::Frame(_) => {}
            }
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.config.ping_interval
    }
}
