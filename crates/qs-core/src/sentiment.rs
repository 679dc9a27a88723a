//! Sentiment observations.
//!
//! A `SentimentSnapshot` is the latest reading for one symbol; a
//! `HistoryPoint` is the chart-ready projection of a snapshot at the moment
//! it was recorded.

use crate::symbol::Symbol;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute sentiment above which a reading is a BUY (below its negation, a SELL).
pub const SIGNAL_THRESHOLD: f64 = 0.3;

/// History bound while the live stream drives the store.
pub const LIVE_HISTORY_BOUND: usize = 50;

/// History bound while the synthetic feed drives the store.
pub const SYNTHETIC_HISTORY_BOUND: usize = 20;

/// Categorical trading signal derived from a sentiment scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Derive the signal for a raw sentiment value.
    ///
    /// `> 0.3` is BUY, `< -0.3` is SELL, everything else (including the
    /// thresholds themselves and NaN) is HOLD.
    pub fn from_sentiment(sentiment: f64) -> Self {
        if sentiment > SIGNAL_THRESHOLD {
            Self::Buy
        } else if sentiment < -SIGNAL_THRESHOLD {
            Self::Sell
        } else {
            Self::Hold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest sentiment reading for a symbol.
///
/// Replaced wholesale on every update; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub symbol: Symbol,
    /// Sentiment in [-1, 1].
    pub sentiment: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub signal: Signal,
    pub timestamp: DateTime<Utc>,
}

impl SentimentSnapshot {
    /// Build a snapshot whose signal is derived from `sentiment`.
    pub fn derived(
        symbol: Symbol,
        sentiment: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            sentiment,
            confidence,
            signal: Signal::from_sentiment(sentiment),
            timestamp,
        }
    }
}

/// One point of a per-symbol history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Local wall-clock time of the observation (`HH:MM:SS`).
    pub time: String,
    pub sentiment: f64,
    pub signal: Signal,
    pub confidence: f64,
}

impl HistoryPoint {
    /// Create a point at `at`; the signal is always derived from `sentiment`.
    pub fn new(at: DateTime<Utc>, sentiment: f64, confidence: f64) -> Self {
        Self {
            time: display_time(at),
            sentiment,
            signal: Signal::from_sentiment(sentiment),
            confidence,
        }
    }

    /// Project a snapshot onto the chart timeline.
    pub fn from_snapshot(snapshot: &SentimentSnapshot) -> Self {
        Self::new(snapshot.timestamp, snapshot.sentiment, snapshot.confidence)
    }
}

fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signal_thresholds() {
        assert_eq!(Signal::from_sentiment(0.31), Signal::Buy);
        assert_eq!(Signal::from_sentiment(0.3), Signal::Hold);
        assert_eq!(Signal::from_sentiment(0.0), Signal::Hold);
        assert_eq!(Signal::from_sentiment(-0.3), Signal::Hold);
        assert_eq!(Signal::from_sentiment(-0.31), Signal::Sell);
        assert_eq!(Signal::from_sentiment(f64::NAN), Signal::Hold);
    }

    #[test]
    fn test_signal_wire_format() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"BUY\"");
        let parsed: Signal = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(parsed, Signal::Sell);
    }

    #[test]
    fn test_history_point_derives_signal() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap();
        let snapshot = SentimentSnapshot {
            symbol: Symbol::from("AAPL"),
            sentiment: -0.6,
            confidence: 0.8,
            // Pushed signal disagrees with the sentiment on purpose.
            signal: Signal::Hold,
            timestamp: at,
        };

        let point = HistoryPoint::from_snapshot(&snapshot);
        assert_eq!(point.signal, Signal::Sell);
        assert_eq!(point.sentiment, -0.6);
        assert_eq!(point.confidence, 0.8);
        assert_eq!(point.time.len(), "HH:MM:SS".len());
    }

    #[test]
    fn test_snapshot_deserializes_iso_timestamp() {
        let json = r#"{
            "symbol": "AAPL",
            "sentiment": 0.5,
            "confidence": 0.9,
            "signal": "BUY",
            "timestamp": "2024-01-02T15:04:05Z"
        }"#;
        let snapshot: SentimentSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.signal, Signal::Buy);
        assert_eq!(snapshot.timestamp.timestamp(), 1_704_207_845);
    }
}
