//! Application configuration.

use crate::controller::ControllerConfig;
use crate::error::{AppError, AppResult};
use qs_core::{Symbol, LIVE_HISTORY_BOUND, SYNTHETIC_HISTORY_BOUND};
use qs_dashboard::DashboardConfig;
use qs_feed::SyntheticConfig;
use qs_telemetry::DEFAULT_LOG_FILTER;
use qs_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `QS__WEBSOCKET__RECONNECT_DELAY_MS`.
pub const ENV_PREFIX: &str = "QS";

/// WebSocket configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Fixed delay between a session loss and the next open attempt (ms).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Open attempts still pending after this long count as failed (ms).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Synthetic fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Time after an open attempt starts before synthetic data is shown (ms).
    #[serde(default = "default_guard_ms")]
    pub guard_ms: u64,
    /// Synthetic tick period (ms).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Probability that a tick also refreshes the news list.
    #[serde(default = "default_news_refresh_probability")]
    pub news_refresh_probability: f64,
    /// Fixed RNG seed for reproducible synthetic data.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_guard_ms() -> u64 {
    2_000
}

fn default_tick_interval_ms() -> u64 {
    10_000
}

fn default_news_refresh_probability() -> f64 {
    0.2
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            guard_ms: default_guard_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            news_refresh_probability: default_news_refresh_probability(),
            seed: None,
        }
    }
}

/// History bounds per mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_live_bound")]
    pub live_bound: usize,
    #[serde(default = "default_synthetic_bound")]
    pub synthetic_bound: usize,
}

fn default_live_bound() -> usize {
    LIVE_HISTORY_BOUND
}

fn default_synthetic_bound() -> usize {
    SYNTHETIC_HISTORY_BOUND
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            live_bound: default_live_bound(),
            synthetic_bound: default_synthetic_bound(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Live stream endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Tracked symbols, fixed for the process lifetime.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_symbols() -> Vec<String> {
    ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN", "META", "NVDA", "SPY", "QQQ"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            symbols: default_symbols(),
            websocket: WsConfig::default(),
            fallback: FallbackConfig::default(),
            history: HistoryConfig::default(),
            dashboard: DashboardConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` (if it exists) layered with `QS__`-prefixed environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to load config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.ws_url.trim().is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        if self.symbols.is_empty() {
            return Err(AppError::Config("symbols must not be empty".to_string()));
        }
        self.tracked_symbols()?;

        if self.websocket.reconnect_delay_ms == 0 {
            return Err(AppError::Config(
                "websocket.reconnect_delay_ms must be > 0".to_string(),
            ));
        }
        if self.websocket.connect_timeout_ms == 0 {
            return Err(AppError::Config(
                "websocket.connect_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.fallback.tick_interval_ms == 0 {
            return Err(AppError::Config(
                "fallback.tick_interval_ms must be > 0".to_string(),
            ));
        }
        let p = self.fallback.news_refresh_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(AppError::Config(format!(
                "fallback.news_refresh_probability must be within [0, 1], got {p}"
            )));
        }
        if self.history.synthetic_bound == 0 || self.history.live_bound == 0 {
            return Err(AppError::Config("history bounds must be > 0".to_string()));
        }
        if self.history.synthetic_bound > self.history.live_bound {
            return Err(AppError::Config(format!(
                "history.synthetic_bound ({}) must not exceed history.live_bound ({})",
                self.history.synthetic_bound, self.history.live_bound
            )));
        }
        if self.dashboard.enabled && self.dashboard.update_interval_ms == 0 {
            return Err(AppError::Config(
                "dashboard.update_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse the configured symbols, dropping duplicates while keeping order.
    pub fn tracked_symbols(&self) -> AppResult<Vec<Symbol>> {
        let mut tracked: Vec<Symbol> = Vec::with_capacity(self.symbols.len());
        for raw in &self.symbols {
            let symbol = Symbol::new(raw.as_str())?;
            if !tracked.contains(&symbol) {
                tracked.push(symbol);
            }
        }
        Ok(tracked)
    }

    /// Transport settings for the live stream.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.ws_url.clone(),
            connect_timeout_ms: self.websocket.connect_timeout_ms,
        }
    }

    /// Controller timing, bounds and synthetic feed settings.
    pub fn controller_config(&self) -> AppResult<ControllerConfig> {
        Ok(ControllerConfig {
            tracked: self.tracked_symbols()?,
            reconnect_delay: Duration::from_millis(self.websocket.reconnect_delay_ms),
            fallback_guard: Duration::from_millis(self.fallback.guard_ms),
            tick_interval: Duration::from_millis(self.fallback.tick_interval_ms),
            live_history_bound: self.history.live_bound,
            synthetic_history_bound: self.history.synthetic_bound,
            synthetic: SyntheticConfig {
                news_refresh_probability: self.fallback.news_refresh_probability,
                seed: self.fallback.seed,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.symbols.len(), 9);
        assert_eq!(config.websocket.reconnect_delay_ms, 5000);
        assert_eq!(config.websocket.connect_timeout_ms, 10000);
        assert_eq!(config.fallback.guard_ms, 2000);
        assert_eq!(config.fallback.tick_interval_ms, 10000);
        assert_eq!(config.history.live_bound, 50);
        assert_eq!(config.history.synthetic_bound, 20);
        assert!(!config.dashboard.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            ws_url = "ws://feed.internal:9000/ws"
            symbols = ["AAPL", "MSFT"]

            [fallback]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.ws_url, "ws://feed.internal:9000/ws");
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.fallback.seed, Some(7));
        assert_eq!(config.fallback.guard_ms, 2000);
        assert_eq!(config.websocket.reconnect_delay_ms, 5000);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = AppConfig::default();
        config.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.symbols.push("  ".to_string());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fallback.news_refresh_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.history.synthetic_bound = 60;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.websocket.reconnect_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tracked_symbols_deduplicate() {
        let config = AppConfig {
            symbols: vec!["AAPL".into(), "MSFT".into(), "AAPL".into()],
            ..Default::default()
        };
        let tracked = config.tracked_symbols().unwrap();
        assert_eq!(tracked, vec![Symbol::from("AAPL"), Symbol::from("MSFT")]);
    }

    #[test]
    fn test_controller_config_conversion() {
        let controller = AppConfig::default().controller_config().unwrap();
        assert_eq!(controller.reconnect_delay, Duration::from_secs(5));
        assert_eq!(controller.fallback_guard, Duration::from_secs(2));
        assert_eq!(controller.tick_interval, Duration::from_secs(10));
        assert_eq!(controller.tracked.len(), 9);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.history.live_bound, 50);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("ws_url"));
        assert!(toml_str.contains("[fallback]"));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.ws_url, defaults.ws_url);
        assert_eq!(config.symbols, defaults.symbols);
        assert_eq!(config.websocket.reconnect_delay_ms, defaults.websocket.reconnect_delay_ms);
        assert_eq!(config.fallback.guard_ms, defaults.fallback.guard_ms);
        assert_eq!(config.fallback.seed, None);
        assert_eq!(config.history.live_bound, defaults.history.live_bound);
        assert_eq!(config.telemetry.log_level, defaults.telemetry.log_level);
        assert!(config.validate().is_ok());
    }
}
