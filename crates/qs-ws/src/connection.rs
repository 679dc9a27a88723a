//! WebSocket session management.
//!
//! A session is a single open attempt plus the message loop that follows it.
//! Retry timing and the live/synthetic decision belong to the caller; a
//! session only reports what happened to it as `SessionEvent`s tagged with
//! its `SessionId`.

use crate::error::{WsError, WsResult};
use crate::message::{InboundMessage, LiveMessage};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Close code reported when the stream ends without a Close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// An open attempt that has neither succeeded nor failed after this long
    /// is reported as a failure.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: 10000,
        }
    }
}

/// Monotonically increasing identifier of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The identifier following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Something that happened to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Handshake completed; the session is live.
    Opened,
    /// A recognized message arrived.
    Message(LiveMessage),
    /// A frame could not be decoded. The session stays open.
    Malformed(String),
    /// The session ended after opening.
    Closed { code: u16, reason: String },
    /// The open attempt or the session failed.
    Failed(WsError),
}

impl SessionEvent {
    /// True for events after which the session task has exited.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failed(_))
    }
}

/// A session event tagged with the session that produced it.
#[derive(Debug)]
pub struct SessionEnvelope {
    pub session: SessionId,
    pub event: SessionEvent,
}

/// Opens live sessions on behalf of the controller.
///
/// `spawn_session` must return immediately. The spawned task reports at most
/// one `Opened`, any number of `Message`/`Malformed`, and exactly one
/// terminal `Closed`/`Failed`, unless `cancel` fires first, in which case it
/// exits without reporting anything further.
pub trait Connector: Send + Sync + 'static {
    fn spawn_session(
        &self,
        session: SessionId,
        events: mpsc::Sender<SessionEnvelope>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>;
}

/// tokio-tungstenite implementation of `Connector`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    config: ConnectionConfig,
}

impl WsConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        crate::init_crypto();
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Connector for WsConnector {
    fn spawn_session(
        &self,
        session: SessionId,
        events: mpsc::Sender<SessionEnvelope>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let config = self.config.clone();
        tokio::spawn(run_session(config, session, events, cancel))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reports events for one session until it ends or is cancelled.
struct SessionReporter {
    session: SessionId,
    events: mpsc::Sender<SessionEnvelope>,
}

impl SessionReporter {
    /// Returns `false` once the receiver is gone.
    async fn report(&self, event: SessionEvent) -> bool {
        self.events
            .send(SessionEnvelope {
                session: self.session,
                event,
            })
            .await
            .is_ok()
    }
}

async fn run_session(
    config: ConnectionConfig,
    session: SessionId,
    events: mpsc::Sender<SessionEnvelope>,
    cancel: CancellationToken,
) {
    let reporter = SessionReporter { session, events };

    let stream = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(%session, "Open attempt cancelled");
            return;
        }
        result = open(&config) => match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%session, error = %e, "WebSocket open failed");
                reporter.report(SessionEvent::Failed(e)).await;
                return;
            }
        },
    };

    info!(%session, url = %config.url, "WebSocket connected");
    if !reporter.report(SessionEvent::Opened).await {
        return;
    }

    if let Some(terminal) = message_loop(stream, &reporter, &cancel).await {
        reporter.report(terminal).await;
    }
}

async fn open(config: &ConnectionConfig) -> WsResult<WsStream> {
    info!(url = %config.url, "Connecting to WebSocket");

    let timeout = Duration::from_millis(config.connect_timeout_ms);
    // TCP_NODELAY
    let connect = connect_async_tls_with_config(config.url.as_str(), None, true, None);
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(WsError::ConnectTimeout(config.connect_timeout_ms)),
    }
}

/// Runs until the session ends. Returns the terminal event to report, or
/// `None` when cancelled or the receiver is gone.
async fn message_loop(
    stream: WsStream,
    reporter: &SessionReporter,
    cancel: &CancellationToken,
) -> Option<SessionEvent> {
    let session = reporter.session;
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(%session, "Session cancelled, sending Close frame");
                if let Err(e) = write.send(Message::Close(None)).await {
                    warn!(%session, ?e, "Failed to send Close frame during shutdown");
                }
                return None;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode(session, &text) {
                            if !reporter.report(event).await {
                                return None;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        debug!(%session, "Received ping, sending pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            return Some(SessionEvent::Failed(e.into()));
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!(%session, "Received pong");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        warn!(%session, code, %reason, "WebSocket closed by server");
                        return Some(SessionEvent::Closed { code, reason });
                    }
                    Some(Err(e)) => {
                        warn!(%session, ?e, "WebSocket read error");
                        return Some(SessionEvent::Failed(e.into()));
                    }
                    None => {
                        warn!(%session, "WebSocket stream ended");
                        return Some(SessionEvent::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: "Stream ended".to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Decode one text frame. Unknown message types produce no event.
fn decode(session: SessionId, text: &str) -> Option<SessionEvent> {
    match InboundMessage::parse(text) {
        Ok(message) => {
            let kind = message.kind();
            match message.into_live(Utc::now()) {
                Some(live) => Some(SessionEvent::Message(live)),
                None => {
                    debug!(%session, kind, "Ignoring unrecognized message");
                    None
                }
            }
        }
        Err(e) => {
            debug!(%session, error = %e, "Malformed message");
            Some(SessionEvent::Malformed(e.to_string()))
        }
    }
}
