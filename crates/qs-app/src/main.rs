//! Quant sentiment feed - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Live sentiment feed with synthetic fallback
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via QS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls provider for wss:// sessions.
    qs_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > QS_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("QS_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = qs_app::AppConfig::load(&config_path)?;

    qs_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting qs-app v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, ws_url = %config.ws_url, "Configuration loaded");

    let app = qs_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
