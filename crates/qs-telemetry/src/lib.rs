//! Prometheus metrics and structured logging for the sentiment feed.
//!
//! - Prometheus metrics for connection state, inbound messages and the synthetic feed
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::Metrics;
