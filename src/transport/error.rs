use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty frame")]
    EmptyFrame,
    #[error("unknown packet type {0:?}")]
    UnknownPacket(char),
    #[error("malformed event packet")]
    MalformedEvent,
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection closed by server")]
    Closed,
    #[error("no ping from server within {0:?}")]
    PingTimeout(std::time::Duration),
}
