//! WebSocket transport for the live sentiment stream.
//!
//! Provides:
//! - `Connector`: Seam between the controller and the transport
//! - `WsConnector`: One tokio-tungstenite session task per open attempt
//! - `InboundMessage` / `LiveMessage`: Wire decoding of the stream
//! - Session events tagged with a `SessionId` so stale sessions can be ignored

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{
    ConnectionConfig, Connector, SessionEnvelope, SessionEvent, SessionId, WsConnector,
};
pub use error::{WsError, WsResult};
pub use message::{InboundMessage, LiveMessage, SentimentWire, WireTimestamp};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Install the ring provider as the process-wide rustls default.
///
/// `wss://` handshakes build their client config from the process default,
/// and with more than one provider compiled in rustls cannot pick one
/// itself. Safe to call repeatedly; `WsConnector::new` calls it.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
