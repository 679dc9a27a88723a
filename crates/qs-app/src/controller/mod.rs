//! Connection lifecycle and synthetic fallback controller.
//!
//! - `machine`: Pure state machine (`StateMachine::handle(Event) -> Vec<Effect>`)
//! - `driver`: Single-task driver executing effects against timers, sessions and the store

pub mod driver;
pub mod machine;

pub use driver::{Controller, ControllerConfig, ControllerHandle};
pub use machine::{Effect, Event, Phase, StateMachine};
