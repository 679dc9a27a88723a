//! Quant sentiment feed application.
//!
//! Orchestrates:
//! - The connection controller (live stream with synthetic fallback)
//! - The optional read-only dashboard API
//! - Configuration, logging and metrics

pub mod app;
pub mod config;
pub mod controller;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use controller::{Controller, ControllerConfig, ControllerHandle};
pub use error::{AppError, AppResult};
