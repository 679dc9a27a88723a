//! Connection controller state machine.
//!
//! `StateMachine::handle` is a pure transition function: it updates the
//! machine's own bookkeeping and returns the effects the driver must execute.
//! It never touches timers, sockets or the store.

use qs_core::ConnectionState;
use qs_ws::LiveMessage;

/// Lifecycle phase of the live transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// An open attempt is in flight (or about to be).
    Connecting,
    /// A session is open.
    Live,
    /// Waiting for the retry timer.
    Reconnecting,
    /// Shut down; every event is ignored.
    Stopped,
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Controller started.
    Start,
    /// The current session completed its handshake.
    SessionOpened,
    /// The current open attempt or session failed.
    SessionFailed,
    /// The current session was closed by the peer.
    SessionClosed,
    /// The current session delivered a recognized message.
    Message(LiveMessage),
    RetryElapsed,
    FallbackGuardElapsed,
    SyntheticTick,
    Shutdown,
}

/// Work for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenSession,
    CloseSession,
    ScheduleRetry,
    CancelRetry,
    ArmFallbackGuard,
    DisarmFallbackGuard,
    /// Begin a synthetic episode: initialize the feed and start the tick interval.
    StartSynthetic,
    /// End the episode: stop the tick interval, keep buffered data.
    StopSynthetic,
    RunSyntheticTick,
    /// Write a live message into the store.
    Apply(LiveMessage),
}

/// Connection controller state.
///
/// Flags mirror the resources the driver holds, so every effect that creates
/// or releases one is emitted exactly once.
#[derive(Debug, Clone)]
pub struct StateMachine {
    phase: Phase,
    started: bool,
    /// Set on the first live message, never cleared.
    latched: bool,
    synthetic_active: bool,
    session_active: bool,
    retry_pending: bool,
    guard_armed: bool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Connecting,
            started: false,
            latched: false,
            synthetic_active: false,
            session_active: false,
            retry_pending: false,
            guard_armed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether live data has ever been received.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn is_synthetic_active(&self) -> bool {
        self.synthetic_active
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    pub fn is_retry_pending(&self) -> bool {
        self.retry_pending
    }

    pub fn is_guard_armed(&self) -> bool {
        self.guard_armed
    }

    /// Mode as published to readers.
    pub fn connection_state(&self) -> ConnectionState {
        match self.phase {
            Phase::Stopped => ConnectionState::Stopped,
            Phase::Live => ConnectionState::Live,
            _ if self.synthetic_active => ConnectionState::Synthetic,
            Phase::Reconnecting => ConnectionState::Reconnecting,
            Phase::Connecting => ConnectionState::Connecting,
        }
    }

    /// Apply one event and return the effects to execute, in order.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase == Phase::Stopped {
            return effects;
        }

        match event {
            Event::Start => {
                if !self.started {
                    self.started = true;
                    self.begin_open(&mut effects);
                }
            }
            Event::SessionOpened => {
                if self.phase == Phase::Connecting && self.session_active {
                    self.phase = Phase::Live;
                    self.disarm_guard(&mut effects);
                    self.stop_synthetic(&mut effects);
                }
            }
            Event::SessionFailed | Event::SessionClosed => {
                if self.session_active {
                    self.session_active = false;
                    self.phase = Phase::Reconnecting;
                    self.disarm_guard(&mut effects);
                    if !self.latched {
                        self.start_synthetic(&mut effects);
                    }
                    self.retry_pending = true;
                    effects.push(Effect::ScheduleRetry);
                }
            }
            Event::Message(message) => {
                if self.phase == Phase::Live {
                    self.latched = true;
                    self.stop_synthetic(&mut effects);
                    effects.push(Effect::Apply(message));
                }
            }
            Event::RetryElapsed => {
                if self.retry_pending {
                    self.retry_pending = false;
                    self.begin_open(&mut effects);
                }
            }
            Event::FallbackGuardElapsed => {
                if self.guard_armed {
                    self.guard_armed = false;
                    if self.phase != Phase::Live && !self.latched {
                        self.start_synthetic(&mut effects);
                    }
                }
            }
            Event::SyntheticTick => {
                if self.synthetic_active && !self.latched {
                    effects.push(Effect::RunSyntheticTick);
                }
            }
            Event::Shutdown => {
                self.phase = Phase::Stopped;
                if self.retry_pending {
                    self.retry_pending = false;
                    effects.push(Effect::CancelRetry);
                }
                self.disarm_guard(&mut effects);
                self.stop_synthetic(&mut effects);
                if self.session_active {
                    self.session_active = false;
                    effects.push(Effect::CloseSession);
                }
            }
        }

        effects
    }

    /// Enter Connecting: open a session and, unless synthetic data is already
    /// showing or live data was ever seen, arm the fallback guard.
    fn begin_open(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Connecting;
        self.session_active = true;
        effects.push(Effect::OpenSession);
        if !self.latched && !self.synthetic_active && !self.guard_armed {
            self.guard_armed = true;
            effects.push(Effect::ArmFallbackGuard);
        }
    }

    fn disarm_guard(&mut self, effects: &mut Vec<Effect>) {
        if self.guard_armed {
            self.guard_armed = false;
            effects.push(Effect::DisarmFallbackGuard);
        }
    }

    fn start_synthetic(&mut self, effects: &mut Vec<Effect>) {
        if !self.synthetic_active && !self.latched {
            self.synthetic_active = true;
            effects.push(Effect::StartSynthetic);
        }
    }

    fn stop_synthetic(&mut self, effects: &mut Vec<Effect>) {
        if self.synthetic_active {
            self.synthetic_active = false;
            effects.push(Effect::StopSynthetic);
        }
    }
}
