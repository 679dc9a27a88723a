//! Connection controller driver.
//!
//! A single tokio task owns the state machine, the feed store writer, the
//! synthetic generator and every timer. All inputs (session events, retry
//! timer, fallback guard, tick interval, shutdown) are serialized through
//! one `select!` loop and handled to completion in arrival order.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use qs_core::{ConnectionState, Symbol};
use qs_feed::{FeedReader, FeedStore, SyntheticConfig, SyntheticFeed};
use qs_telemetry::Metrics;
use qs_ws::{Connector, LiveMessage, SessionEnvelope, SessionEvent, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::machine::{Effect, Event, Phase, StateMachine};

/// Capacity of the session event channel.
const SESSION_EVENT_CAPACITY: usize = 256;

/// Controller timing, bounds and synthetic feed settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Symbols fixed for the controller lifetime.
    pub tracked: Vec<Symbol>,
    /// Delay between a session loss and the next open attempt.
    pub reconnect_delay: Duration,
    /// Delay after an open attempt starts before synthetic data is shown.
    pub fallback_guard: Duration,
    /// Synthetic tick period.
    pub tick_interval: Duration,
    pub live_history_bound: usize,
    pub synthetic_history_bound: usize,
    pub synthetic: SyntheticConfig,
}

/// Handle to a running controller.
pub struct ControllerHandle {
    reader: FeedReader,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Read-only view of the feed the controller writes.
    pub fn reader(&self) -> FeedReader {
        self.reader.clone()
    }

    /// Stop the controller and wait until every timer is dropped and the
    /// session task has exited.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Controller task ended abnormally");
        }
    }
}

/// The live session currently owned by the controller.
struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Connection lifecycle and fallback controller.
pub struct Controller<C: Connector> {
    config: ControllerConfig,
    connector: C,
    machine: StateMachine,
    store: FeedStore,
    synthetic: SyntheticFeed,

    last_session_id: SessionId,
    session: Option<ActiveSession>,
    /// Cancelled sessions still to be joined on shutdown.
    closing: Vec<JoinHandle<()>>,
    events_tx: mpsc::Sender<SessionEnvelope>,
    events_rx: mpsc::Receiver<SessionEnvelope>,

    retry: Option<Pin<Box<Sleep>>>,
    guard: Option<Pin<Box<Sleep>>>,
    ticker: Option<Interval>,
    shutdown: CancellationToken,

    /// Reason label for the next reconnect metric.
    loss_reason: &'static str,
    published: ConnectionState,
}

impl<C: Connector> Controller<C> {
    /// Build a controller without starting it.
    pub fn new(config: ControllerConfig, connector: C) -> Self {
        let store = FeedStore::new(config.tracked.clone(), config.live_history_bound);
        let synthetic = SyntheticFeed::new(config.tracked.clone(), config.synthetic.clone());
        let (events_tx, events_rx) = mpsc::channel(SESSION_EVENT_CAPACITY);

        Self {
            config,
            connector,
            machine: StateMachine::new(),
            store,
            synthetic,
            last_session_id: SessionId::default(),
            session: None,
            closing: Vec::new(),
            events_tx,
            events_rx,
            retry: None,
            guard: None,
            ticker: None,
            shutdown: CancellationToken::new(),
            loss_reason: "open_failed",
            published: ConnectionState::Connecting,
        }
    }

    /// Read-only view of the feed this controller writes.
    pub fn reader(&self) -> FeedReader {
        self.store.reader()
    }

    /// Start the controller on its own task.
    pub fn spawn(config: ControllerConfig, connector: C) -> ControllerHandle {
        let controller = Self::new(config, connector);
        let reader = controller.reader();
        let shutdown = controller.shutdown.clone();
        let task = tokio::spawn(controller.run());
        ControllerHandle {
            reader,
            shutdown,
            task,
        }
    }

    /// Run until shutdown is requested.
    pub async fn run(mut self) {
        info!(
            symbols = self.config.tracked.len(),
            reconnect_delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "Connection controller started"
        );
        Metrics::controller_state_set(self.published);
        Metrics::ws_not_live();

        self.dispatch(Event::Start);

        loop {
            let event = tokio::select! {
                biased;

                () = self.shutdown.cancelled() => Event::Shutdown,

                Some(envelope) = self.events_rx.recv() => {
                    match self.session_event(envelope) {
                        Some(event) => event,
                        None => continue,
                    }
                }

                () = wait_deadline(&mut self.retry) => {
                    self.retry = None;
                    Event::RetryElapsed
                }

                () = wait_deadline(&mut self.guard) => {
                    self.guard = None;
                    Event::FallbackGuardElapsed
                }

                _ = wait_tick(&mut self.ticker) => Event::SyntheticTick,
            };

            let stop = event == Event::Shutdown;
            self.dispatch(event);
            if stop {
                break;
            }
        }

        // Session tasks blocked on a full channel must see it closed to exit.
        self.events_rx.close();
        for handle in self.closing.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session task ended abnormally");
            }
        }
        info!("Connection controller stopped");
    }

    /// Translate a session report into a machine event. Reports from
    /// sessions other than the current one are dropped.
    fn session_event(&mut self, envelope: SessionEnvelope) -> Option<Event> {
        let current = self.session.as_ref().map(|s| s.id);
        if current != Some(envelope.session) {
            debug!(session = %envelope.session, "Ignoring event from stale session");
            return None;
        }

        if envelope.event.is_terminal() {
            // The session task has exited on its own.
            self.session = None;
        }

        match envelope.event {
            SessionEvent::Opened => Some(Event::SessionOpened),
            SessionEvent::Message(message) => Some(Event::Message(message)),
            SessionEvent::Malformed(error) => {
                warn!(session = %envelope.session, %error, "Dropping malformed message");
                Metrics::ws_malformed();
                None
            }
            SessionEvent::Closed { code, reason } => {
                info!(session = %envelope.session, code, %reason, "Live session closed");
                self.loss_reason = "closed";
                Some(Event::SessionClosed)
            }
            SessionEvent::Failed(error) => {
                self.loss_reason = if self.machine.phase() == Phase::Live {
                    "session_error"
                } else {
                    "open_failed"
                };
                warn!(session = %envelope.session, %error, reason = self.loss_reason, "Live session failed");
                Some(Event::SessionFailed)
            }
        }
    }

    fn dispatch(&mut self, event: Event) {
        for effect in self.machine.handle(event) {
            self.execute(effect);
        }
        self.publish_state();
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::OpenSession => self.open_session(),
            Effect::CloseSession => {
                if let Some(session) = self.session.take() {
                    debug!(session = %session.id, "Closing live session");
                    session.cancel.cancel();
                    self.closing.push(session.handle);
                }
            }
            Effect::ScheduleRetry => {
                Metrics::ws_reconnect(self.loss_reason);
                info!(
                    delay_ms = self.config.reconnect_delay.as_millis() as u64,
                    reason = self.loss_reason,
                    "Scheduling reconnect"
                );
                self.retry = Some(Box::pin(sleep(self.config.reconnect_delay)));
            }
            Effect::CancelRetry => {
                self.retry = None;
            }
            Effect::ArmFallbackGuard => {
                self.guard = Some(Box::pin(sleep(self.config.fallback_guard)));
            }
            Effect::DisarmFallbackGuard => {
                self.guard = None;
            }
            Effect::StartSynthetic => self.start_synthetic(),
            Effect::StopSynthetic => {
                self.ticker = None;
                self.store.set_history_bound(self.config.live_history_bound);
                info!("Synthetic feed stopped");
            }
            Effect::RunSyntheticTick => {
                if self.synthetic.tick(&self.store, Utc::now()) {
                    Metrics::synthetic_tick();
                }
            }
            Effect::Apply(message) => self.apply(message),
        }
    }

    fn open_session(&mut self) {
        // No session is current here; cancel any leftover.
        if let Some(previous) = self.session.take() {
            previous.cancel.cancel();
            self.closing.push(previous.handle);
        }

        self.last_session_id = self.last_session_id.next();
        let id = self.last_session_id;
        let cancel = self.shutdown.child_token();
        let handle = self
            .connector
            .spawn_session(id, self.events_tx.clone(), cancel.clone());
        debug!(session = %id, "Opening live session");
        self.session = Some(ActiveSession { id, cancel, handle });
    }

    fn start_synthetic(&mut self) {
        self.store
            .set_history_bound(self.config.synthetic_history_bound);
        self.synthetic.initialize(&self.store, Utc::now());

        let period = self.config.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);

        Metrics::synthetic_episode();
        info!(
            tick_interval_ms = period.as_millis() as u64,
            "Synthetic feed started"
        );
    }

    fn apply(&mut self, message: LiveMessage) {
        let now = Utc::now();
        let kind = message.kind();
        match message {
            LiveMessage::InitialData { sentiment, news } => {
                debug!(
                    symbols = sentiment.as_ref().map(|s| s.len()),
                    news = news.as_ref().map(|n| n.len()),
                    "Applying initial data"
                );
                self.store.apply_live_initial(sentiment, news, now);
            }
            LiveMessage::SentimentUpdate(updates) => {
                debug!(count = updates.len(), "Applying sentiment update");
                self.store.apply_live_updates(updates, now);
            }
            LiveMessage::NewsUpdate(news) => {
                debug!(count = news.len(), "Applying news update");
                self.store.apply_live_news(news);
            }
        }
        Metrics::ws_message(kind);
    }

    fn publish_state(&mut self) {
        let state = self.machine.connection_state();
        if state == self.published {
            return;
        }
        info!(from = %self.published, to = %state, "Connection state changed");
        self.published = state;
        self.store.set_connection_state(state);
        Metrics::controller_state_set(state);
        if state == ConnectionState::Live {
            Metrics::ws_live();
        } else {
            Metrics::ws_not_live();
        }
    }
}

/// Wait for an optional one-shot timer; never resolves when unset.
async fn wait_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

/// Wait for the next tick of an optional interval; never resolves when unset.
async fn wait_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(interval) => interval.tick().await,
        None => pending().await,
    }
}
