//! Scripted `Connector` for deterministic controller tests.
//!
//! Each open attempt consumes the next script; once the queue is empty the
//! fallback script is used. Steps run against tokio time, so paused-clock
//! tests control every delay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use qs_ws::{Connector, LiveMessage, SessionEnvelope, SessionEvent, SessionId, WsError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One step of a scripted session.
#[derive(Debug, Clone)]
pub enum Step {
    /// Report the handshake as complete.
    Open,
    /// Deliver a live message.
    Send(LiveMessage),
    /// Deliver an undecodable frame.
    Malformed,
    /// Sleep before the next step.
    Wait(Duration),
    /// Peer closes the session.
    Close,
    /// Open attempt or session fails.
    Fail,
    /// Never report anything else; only cancellation ends the session.
    Hang,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Connector replaying scripted sessions.
#[derive(Clone)]
pub struct ScriptedConnector {
    scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
    fallback: Vec<Step>,
    counters: Arc<Counters>,
}

impl ScriptedConnector {
    /// `scripts` are consumed in order; `fallback` is used once they run out.
    pub fn new(scripts: Vec<Vec<Step>>, fallback: Vec<Step>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            fallback,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Every attempt fails immediately.
    pub fn always_failing() -> Self {
        Self::new(Vec::new(), vec![Step::Fail])
    }

    /// Number of open attempts so far.
    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions that observed cancellation.
    pub fn cancelled(&self) -> usize {
        self.counters.cancelled.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> Vec<Step> {
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Connector for ScriptedConnector {
    fn spawn_session(
        &self,
        session: SessionId,
        events: mpsc::Sender<SessionEnvelope>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.next_script();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    counters.cancelled.fetch_add(1, Ordering::SeqCst);
                }
                () = play(session, script, events) => {}
            }
        })
    }
}

async fn play(session: SessionId, script: Vec<Step>, events: mpsc::Sender<SessionEnvelope>) {
    let report = |event: SessionEvent| {
        let events = events.clone();
        async move {
            let _ = events.send(SessionEnvelope { session, event }).await;
        }
    };

    for step in script {
        match step {
            Step::Open => report(SessionEvent::Opened).await,
            Step::Send(message) => report(SessionEvent::Message(message)).await,
            Step::Malformed => {
                report(SessionEvent::Malformed("expected value at line 1".to_string())).await
            }
            Step::Wait(duration) => tokio::time::sleep(duration).await,
            Step::Close => {
                report(SessionEvent::Closed {
                    code: 1000,
                    reason: "scripted close".to_string(),
                })
                .await;
                return;
            }
            Step::Fail => {
                report(SessionEvent::Failed(WsError::ConnectTimeout(10_000))).await;
                return;
            }
            Step::Hang => break,
        }
    }

    // A session whose script did not end it stays open until cancelled.
    std::future::pending::<()>().await;
}

/// Connector whose session ignores cancellation and reports malformed frames
/// until the controller's channel refuses them.
#[derive(Clone, Default)]
pub struct FloodingConnector {
    exited: Arc<AtomicUsize>,
}

impl FloodingConnector {
    /// Number of session tasks that have returned.
    pub fn exited(&self) -> usize {
        self.exited.load(Ordering::SeqCst)
    }
}

impl Connector for FloodingConnector {
    fn spawn_session(
        &self,
        session: SessionId,
        events: mpsc::Sender<SessionEnvelope>,
        _cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let exited = Arc::clone(&self.exited);
        tokio::spawn(async move {
            loop {
                let envelope = SessionEnvelope {
                    session,
                    event: SessionEvent::Malformed("{".to_string()),
                };
                if events.send(envelope).await.is_err() {
                    break;
                }
            }
            exited.fetch_add(1, Ordering::SeqCst);
        })
    }
}
