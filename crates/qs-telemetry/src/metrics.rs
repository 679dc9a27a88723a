//! Prometheus metrics for the sentiment feed.
//!
//! Covers:
//! - Live session state and controller mode
//! - Reconnect attempts
//! - Inbound message volume and malformed frames
//! - Synthetic feed activity
//! - Dashboard client connections
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error surfaced on first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use qs_core::ConnectionState;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter,
    register_int_gauge, CounterVec, Encoder, Gauge, GaugeVec, IntCounter, IntGauge, TextEncoder,
};

/// Live session state (1 = live session open, 0 = none).
pub static WS_LIVE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("qs_ws_live", "Live session state (1=open)").unwrap()
});

/// Controller current mode.
/// Labels: state (connecting/live/reconnecting/synthetic/stopped)
pub static CONTROLLER_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "qs_controller_state",
        "Connection controller current mode (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnect attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qs_ws_reconnect_total",
        "Total live session reconnect attempts",
        &["reason"]
    )
    .unwrap()
});

/// Inbound live messages applied.
pub static WS_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qs_ws_messages_total",
        "Inbound live messages applied to the store",
        &["kind"]
    )
    .unwrap()
});

/// Inbound frames that failed to decode.
pub static WS_MALFORMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "qs_ws_malformed_total",
        "Inbound frames dropped as malformed"
    )
    .unwrap()
});

/// Synthetic ticks written to the store.
pub static SYNTHETIC_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "qs_synthetic_ticks_total",
        "Synthetic feed ticks written to the store"
    )
    .unwrap()
});

/// Synthetic episodes started.
pub static SYNTHETIC_EPISODES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "qs_synthetic_episodes_total",
        "Synthetic feed episodes started"
    )
    .unwrap()
});

/// Open dashboard WebSocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "qs_dashboard_clients",
        "Open dashboard WebSocket connections"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record live session opened.
    pub fn ws_live() {
        WS_LIVE.set(1.0);
    }

    /// Record live session gone.
    pub fn ws_not_live() {
        WS_LIVE.set(0.0);
    }

    /// Set the controller mode. Only the active state is 1.
    pub fn controller_state_set(state: ConnectionState) {
        for s in ConnectionState::ALL.iter().map(ConnectionState::as_str) {
            CONTROLLER_STATE.with_label_values(&[s]).set(0.0);
        }
        CONTROLLER_STATE.with_label_values(&[state.as_str()]).set(1.0);
    }

    /// Record a reconnect attempt.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an applied live message.
    pub fn ws_message(kind: &str) {
        WS_MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a malformed frame.
    pub fn ws_malformed() {
        WS_MALFORMED_TOTAL.inc();
    }

    pub fn synthetic_tick() {
        SYNTHETIC_TICKS_TOTAL.inc();
    }

    pub fn synthetic_episode() {
        SYNTHETIC_EPISODES_TOTAL.inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
