//! Application orchestration.

use crate::config::AppConfig;
use crate::controller::{Controller, ControllerHandle};
use crate::error::AppResult;
use qs_dashboard::{run_server, DashboardState};
use qs_ws::WsConnector;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Create a new application. Fails on unusable configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Start the controller (and the dashboard when enabled) and run until Ctrl+C.
    pub async fn run(self) -> AppResult<()> {
        let controller = self.start()?;
        let shutdown = CancellationToken::new();
        let dashboard = self.start_dashboard(&controller, &shutdown);

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        shutdown.cancel();
        controller.shutdown().await;
        if let Some(handle) = dashboard {
            match handle.await {
                Ok(()) => {}
                Err(e) => error!(error = %e, "Dashboard task ended abnormally"),
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Spawn the connection controller.
    pub fn start(&self) -> AppResult<ControllerHandle> {
        let controller_config = self.config.controller_config()?;
        info!(
            ws_url = %self.config.ws_url,
            symbols = ?self.config.symbols,
            "Starting connection controller"
        );
        let connector = WsConnector::new(self.config.connection_config());
        Ok(Controller::spawn(controller_config, connector))
    }

    fn start_dashboard(
        &self,
        controller: &ControllerHandle,
        shutdown: &CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if !self.config.dashboard.enabled {
            return None;
        }

        let state = DashboardState::new(controller.reader());
        let config = self.config.dashboard.clone();
        let shutdown = shutdown.clone().cancelled_owned();
        Some(tokio::spawn(async move {
            if let Err(e) = run_server(state, config, shutdown).await {
                error!(error = %e, "Dashboard server failed");
            }
        }))
    }
}
