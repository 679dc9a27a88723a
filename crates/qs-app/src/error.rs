//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    Core(#[from] qs_core::CoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] qs_telemetry::TelemetryError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] qs_dashboard::DashboardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
