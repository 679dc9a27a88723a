//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use std::collections::BTreeMap;

use qs_core::{ConnectionStatus, NewsItem, SentimentSnapshot, Symbol};
use serde::Serialize;

/// Full dashboard state snapshot (sent on initial connection and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    /// Connection summary.
    pub connection: ConnectionStatus,
    /// Latest snapshot per symbol.
    pub sentiment: BTreeMap<Symbol, SentimentSnapshot>,
    /// Current news list.
    pub news: Vec<NewsItem>,
}

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic update.
    Update {
        /// Update timestamp.
        timestamp_ms: i64,
        /// Connection summary.
        connection: ConnectionStatus,
        /// Latest snapshot per symbol.
        sentiment: BTreeMap<Symbol, SentimentSnapshot>,
        /// News list (only when it changed since the previous update).
        #[serde(skip_serializing_if = "Option::is_none")]
        news: Option<Vec<NewsItem>>,
    },
}
