//! qs-dashboard - Read-only API over the sentiment feed.
//!
//! Serializes what the connection controller publishes; it never writes to
//! the feed.
//!
//! - REST API for the current snapshot, per-symbol history, news and status
//! - Prometheus metrics at `/metrics`
//! - WebSocket with an initial snapshot followed by periodic updates
//!
//! # Usage
//!
//! ```ignore
//! use qs_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let dashboard_state = DashboardState::new(controller.reader());
//! let config = DashboardConfig::default();
//! tokio::spawn(async move {
//!     if let Err(e) = run_server(dashboard_state, config, shutdown).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use server::{create_router, run_server, AppState};
pub use state::DashboardState;
pub use types::{DashboardMessage, DashboardSnapshot};
