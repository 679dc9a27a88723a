//! WebSocket message types.
//!
//! Inbound frames are JSON objects tagged by `type`. `InboundMessage` is the
//! lenient wire form; `LiveMessage` is the validated form handed to the
//! controller.

use crate::error::{WsError, WsResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use qs_core::{NewsItem, SentimentSnapshot, Signal, Symbol};
use serde::Deserialize;
use std::collections::HashMap;

// ============================================================================
// Wire format
// ============================================================================

/// Inbound stream message as received on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Full state sent when a session opens.
    InitialData {
        #[serde(default)]
        sentiment: Option<HashMap<String, SentimentWire>>,
        #[serde(default)]
        news: Option<Vec<NewsItem>>,
    },
    /// Per-symbol sentiment pushes.
    SentimentUpdate { data: Vec<SentimentWire> },
    /// Replacement news list.
    NewsUpdate { data: Vec<NewsItem> },
    /// Any other `type`.
    #[serde(other)]
    Unknown,
}

/// Sentiment entry as pushed by the stream. Every field but `sentiment` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentWire {
    #[serde(default)]
    pub symbol: Option<String>,
    pub sentiment: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

/// Timestamp as either ISO-8601 text or epoch milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(f64),
    Text(String),
}

impl WireTimestamp {
    /// Resolve to UTC; `None` if the value cannot be interpreted.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
            Self::Millis(_) => None,
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                        .map(|naive| naive.and_utc())
                })
                .ok(),
        }
    }
}

impl SentimentWire {
    /// Convert to a snapshot.
    ///
    /// The entry's own `symbol` wins over `fallback_symbol` (the map key in
    /// `initial_data`). A missing signal is derived from the sentiment and a
    /// missing or unreadable timestamp becomes `received_at`. Returns `None`
    /// when no usable symbol is available.
    pub fn into_snapshot(
        self,
        fallback_symbol: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Option<SentimentSnapshot> {
        let raw = self.symbol.as_deref().or(fallback_symbol)?;
        let symbol = Symbol::new(raw).ok()?;
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(WireTimestamp::to_utc)
            .unwrap_or(received_at);
        Some(SentimentSnapshot {
            symbol,
            sentiment: self.sentiment,
            confidence: self.confidence,
            signal: self
                .signal
                .unwrap_or_else(|| Signal::from_sentiment(self.sentiment)),
            timestamp,
        })
    }
}

impl InboundMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> WsResult<Self> {
        serde_json::from_str(text).map_err(|e| WsError::Malformed(e.to_string()))
    }

    /// Message kind for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialData { .. } => "initial_data",
            Self::SentimentUpdate { .. } => "sentiment_update",
            Self::NewsUpdate { .. } => "news_update",
            Self::Unknown => "unknown",
        }
    }

    /// Validate into a `LiveMessage`. `Unknown` yields `None`.
    pub fn into_live(self, received_at: DateTime<Utc>) -> Option<LiveMessage> {
        match self {
            Self::InitialData { sentiment, news } => {
                let sentiment = sentiment.map(|entries| {
                    entries
                        .into_iter()
                        .filter_map(|(key, wire)| {
                            wire.into_snapshot(Some(&key), received_at)
                                .map(|snapshot| (snapshot.symbol.clone(), snapshot))
                        })
                        .collect()
                });
                Some(LiveMessage::InitialData { sentiment, news })
            }
            Self::SentimentUpdate { data } => Some(LiveMessage::SentimentUpdate(
                data.into_iter()
                    .filter_map(|wire| wire.into_snapshot(None, received_at))
                    .collect(),
            )),
            Self::NewsUpdate { data } => Some(LiveMessage::NewsUpdate(data)),
            Self::Unknown => None,
        }
    }
}

// ============================================================================
// Validated form
// ============================================================================

/// A recognized live message ready to be applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveMessage {
    /// Absent parts leave the corresponding store part untouched.
    InitialData {
        sentiment: Option<HashMap<Symbol, SentimentSnapshot>>,
        news: Option<Vec<NewsItem>>,
    },
    SentimentUpdate(Vec<SentimentSnapshot>),
    NewsUpdate(Vec<NewsItem>),
}

impl LiveMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialData { .. } => "initial_data",
            Self::SentimentUpdate(_) => "sentiment_update",
            Self::NewsUpdate(_) => "news_update",
        }
    }
}
