//! Dashboard state.
//!
//! Thin read-only adapter over the feed reader.

use chrono::Utc;
use qs_core::{ConnectionStatus, HistoryPoint, NewsItem};
use qs_feed::FeedReader;

use crate::types::DashboardSnapshot;

/// Read-only state shared by every handler.
#[derive(Debug, Clone)]
pub struct DashboardState {
    reader: FeedReader,
}

impl DashboardState {
    pub fn new(reader: FeedReader) -> Self {
        Self { reader }
    }

    /// Collect a full snapshot of the feed.
    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            connection: self.reader.connection_status(),
            sentiment: self.reader.snapshots().into_iter().collect(),
            news: self.reader.get_news(),
        }
    }

    /// History for `symbol`, or `None` if the symbol is not tracked and has no data.
    pub fn history(&self, symbol: &str) -> Option<Vec<HistoryPoint>> {
        let history = self.reader.get_history(symbol);
        let tracked = self
            .reader
            .tracked_symbols()
            .iter()
            .any(|s| s.as_str() == symbol);
        if history.is_empty() && !tracked {
            None
        } else {
            Some(history)
        }
    }

    pub fn news(&self) -> Vec<NewsItem> {
        self.reader.get_news()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.reader.connection_status()
    }
}
