//! Errors raised while opening or running a live session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    /// Handshake, TLS or socket failure.
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Open attempt neither succeeded nor failed in time.
    #[error("Connect timed out after {0}ms")]
    ConnectTimeout(u64),

    /// Text frame that is not a valid feed message.
    #[error("Malformed frame: {0}")]
    Malformed(String),
}

pub type WsResult<T> = Result<T, WsError>;
