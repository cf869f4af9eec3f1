use thiserror::Error;

/// Errors surfaced by the low-level websocket/HTTP integration layer.
///
/// Per the transient-I/O error taxonomy: every variant here is recoverable
/// by the caller (reconnect, retry, drop-and-log) — nothing in this crate
/// panics or propagates past a worker/fetcher boundary.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("failed to parse URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("websocket connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("websocket read timed out after {0:?} with no message")]
    ReadTimeout(std::time::Duration),

    #[error("failed to deserialise JSON message: {error}, payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("failed to deserialise binary payload: {error}")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http request rate limited, retry after: {retry_after:?}")]
    RateLimited { retry_after: Option<std::time::Duration> },

    #[error("http request rejected permanently with status {status}: {body}")]
    Fatal { status: reqwest::StatusCode, body: String },

    #[error("subscription was rejected by the exchange: {0}")]
    Subscribe(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(value))
    }
}

/// Marks an error as unrecoverable for the purposes of a [`crate::channel::ChannelTxDroppable`].
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}
