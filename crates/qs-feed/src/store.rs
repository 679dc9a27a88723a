//! Snapshot store.
//!
//! Combines the per-symbol snapshot map, the bounded history, the news list
//! and the connection status into one state published behind a lock.
//! `FeedStore` is the single writer (held by the controller); any number of
//! `FeedReader`s observe copies of the state.

use crate::history::HistoryBuffer;
use crate::synthetic::{SyntheticFrame, SyntheticTick};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use qs_core::{
    ConnectionState, ConnectionStatus, HistoryPoint, NewsItem, SentimentSnapshot, Symbol,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Everything the presentation layer can observe.
#[derive(Debug)]
struct FeedState {
    /// Latest snapshot per symbol.
    snapshots: HashMap<Symbol, SentimentSnapshot>,
    /// Bounded history per symbol.
    history: HistoryBuffer,
    /// Current news list (replaced wholesale).
    news: Vec<NewsItem>,
    /// Connection summary.
    status: ConnectionStatus,
    /// Set on the first live write, never cleared.
    live_latched: bool,
}

impl FeedState {
    fn new(history_bound: usize) -> Self {
        Self {
            snapshots: HashMap::new(),
            history: HistoryBuffer::new(history_bound),
            news: Vec::new(),
            status: ConnectionStatus::default(),
            live_latched: false,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.status.last_update_time = Some(now);
    }
}

/// Writer side of the feed state. Only the connection controller holds one.
#[derive(Debug)]
pub struct FeedStore {
    tracked: Arc<[Symbol]>,
    inner: Arc<RwLock<FeedState>>,
}

impl FeedStore {
    /// Create an empty store for a fixed set of tracked symbols.
    pub fn new(tracked: Vec<Symbol>, history_bound: usize) -> Self {
        Self {
            tracked: tracked.into(),
            inner: Arc::new(RwLock::new(FeedState::new(history_bound))),
        }
    }

    /// Create a read-only view sharing this store's state.
    pub fn reader(&self) -> FeedReader {
        FeedReader {
            tracked: Arc::clone(&self.tracked),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Symbols fixed at startup.
    pub fn tracked_symbols(&self) -> &[Symbol] {
        &self.tracked
    }

    /// Check whether any live data has been written.
    pub fn is_live_latched(&self) -> bool {
        self.inner.read().live_latched
    }

    /// Change the history bound, trimming every series that exceeds it.
    pub fn set_history_bound(&self, bound: usize) {
        let mut state = self.inner.write();
        if state.history.bound() != bound {
            debug!(from = state.history.bound(), to = bound, "History bound changed");
            state.history.set_bound(bound);
        }
    }

    /// Publish the controller's current mode.
    pub fn set_connection_state(&self, connection: ConnectionState) {
        let mut state = self.inner.write();
        state.status.state = connection;
        state.status.is_live = connection == ConnectionState::Live;
        state.status.is_synthetic = connection == ConnectionState::Synthetic;
    }

    // ------------------------------------------------------------------
    // Live writes
    // ------------------------------------------------------------------

    /// Apply an initial live snapshot.
    ///
    /// Present parts replace the snapshot map / news list wholesale; absent
    /// parts are left untouched.
    pub fn apply_live_initial(
        &self,
        sentiment: Option<HashMap<Symbol, SentimentSnapshot>>,
        news: Option<Vec<NewsItem>>,
        now: DateTime<Utc>,
    ) {
        let mut state = self.inner.write();
        state.live_latched = true;
        if let Some(snapshots) = sentiment {
            state.snapshots = snapshots;
        }
        if let Some(news) = news {
            state.news = news;
        }
        state.touch(now);
    }

    /// Apply a batch of per-symbol live updates, appending one history point each.
    pub fn apply_live_updates(&self, updates: Vec<SentimentSnapshot>, now: DateTime<Utc>) {
        let mut state = self.inner.write();
        state.live_latched = true;
        for snapshot in updates {
            let point = HistoryPoint::from_snapshot(&snapshot);
            state.history.append(&snapshot.symbol, point);
            state.snapshots.insert(snapshot.symbol.clone(), snapshot);
        }
        state.touch(now);
    }

    /// Replace the news list with live news.
    pub fn apply_live_news(&self, news: Vec<NewsItem>) {
        let mut state = self.inner.write();
        state.live_latched = true;
        state.news = news;
    }

    // ------------------------------------------------------------------
    // Synthetic writes (refused once live data has arrived)
    // ------------------------------------------------------------------

    /// Replace snapshots, history and news with a freshly initialized synthetic frame.
    ///
    /// Returns `false` (and writes nothing) once live data has been received.
    pub fn apply_synthetic_initial(&self, frame: SyntheticFrame, now: DateTime<Utc>) -> bool {
        let mut state = self.inner.write();
        if state.live_latched {
            return false;
        }
        state.snapshots = frame
            .snapshots
            .into_iter()
            .map(|snapshot| (snapshot.symbol.clone(), snapshot))
            .collect();
        state.history.clear();
        for (symbol, points) in frame.history {
            state.history.replace(&symbol, points);
        }
        state.news = frame.news;
        state.touch(now);
        true
    }

    /// Apply one synthetic tick.
    ///
    /// Returns `false` (and writes nothing) once live data has been received.
    pub fn apply_synthetic_tick(&self, tick: SyntheticTick, now: DateTime<Utc>) -> bool {
        let mut state = self.inner.write();
        if state.live_latched {
            return false;
        }
        for snapshot in tick.snapshots {
            let point = HistoryPoint::from_snapshot(&snapshot);
            state.history.append(&snapshot.symbol, point);
            state.snapshots.insert(snapshot.symbol.clone(), snapshot);
        }
        if let Some(news) = tick.news {
            state.news = news;
        }
        state.touch(now);
        true
    }
}

/// Read-only view of the feed state.
///
/// Every accessor returns an owned copy; nothing handed out aliases the store.
#[derive(Debug, Clone)]
pub struct FeedReader {
    tracked: Arc<[Symbol]>,
    inner: Arc<RwLock<FeedState>>,
}

impl FeedReader {
    /// Latest snapshot for `symbol`.
    pub fn get_snapshot(&self, symbol: &str) -> Option<SentimentSnapshot> {
        self.inner.read().snapshots.get(symbol).cloned()
    }

    /// History series for `symbol`, oldest first.
    pub fn get_history(&self, symbol: &str) -> Vec<HistoryPoint> {
        self.inner.read().history.get(symbol)
    }

    /// Current news list.
    pub fn get_news(&self) -> Vec<NewsItem> {
        self.inner.read().news.clone()
    }

    /// Connection summary.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.read().status
    }

    /// All current snapshots keyed by symbol.
    pub fn snapshots(&self) -> HashMap<Symbol, SentimentSnapshot> {
        self.inner.read().snapshots.clone()
    }

    /// Current history bound.
    pub fn history_bound(&self) -> usize {
        self.inner.read().history.bound()
    }

    /// Symbols fixed at startup.
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        self.tracked.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qs_core::Signal;

    fn symbols() -> Vec<Symbol> {
        vec![Symbol::from("AAPL"), Symbol::from("MSFT")]
    }

    fn snapshot(symbol: &str, sentiment: f64) -> SentimentSnapshot {
        SentimentSnapshot::derived(Symbol::from(symbol), sentiment, 0.9, Utc::now())
    }

    fn news(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            summary: String::new(),
            published: "2024-01-02T15:04:05Z".to_string(),
            source: "Reuters".to_string(),
            sentiment_score: 0.2,
            sentiment_label: "positive".to_string(),
            symbols: Default::default(),
        }
    }

    #[test]
    fn test_live_initial_replaces_wholesale() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();
        store.apply_live_updates(vec![snapshot("MSFT", -0.5)], Utc::now());

        let mut sentiment = HashMap::new();
        sentiment.insert(Symbol::from("AAPL"), snapshot("AAPL", 0.5));
        store.apply_live_initial(Some(sentiment), Some(vec![news("a")]), Utc::now());

        assert_eq!(reader.get_snapshot("AAPL").map(|s| s.signal), Some(Signal::Buy));
        assert!(reader.get_snapshot("MSFT").is_none());
        assert_eq!(reader.get_news().len(), 1);
    }

    #[test]
    fn test_live_initial_absent_parts_untouched() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();
        store.apply_live_news(vec![news("kept")]);

        let mut sentiment = HashMap::new();
        sentiment.insert(Symbol::from("AAPL"), snapshot("AAPL", 0.1));
        store.apply_live_initial(Some(sentiment), None, Utc::now());

        assert_eq!(reader.get_news()[0].title, "kept");
    }

    #[test]
    fn test_live_updates_upsert_per_symbol() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();

        store.apply_live_updates(vec![snapshot("AAPL", 0.5)], Utc::now());
        store.apply_live_updates(vec![snapshot("MSFT", -0.5)], Utc::now());

        assert!(reader.get_snapshot("AAPL").is_some());
        assert_eq!(reader.get_snapshot("MSFT").map(|s| s.signal), Some(Signal::Sell));
        assert_eq!(reader.get_history("AAPL").len(), 1);
        assert!(reader.connection_status().last_update_time.is_some());
    }

    #[test]
    fn test_pushed_signal_kept_on_snapshot_not_history() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();
        let mut pushed = snapshot("AAPL", 0.9);
        pushed.signal = Signal::Hold;

        store.apply_live_updates(vec![pushed], Utc::now());

        assert_eq!(reader.get_snapshot("AAPL").map(|s| s.signal), Some(Signal::Hold));
        assert_eq!(reader.get_history("AAPL")[0].signal, Signal::Buy);
    }

    #[test]
    fn test_live_news_does_not_touch_last_update() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();
        store.apply_live_news(vec![news("a"), news("b")]);
        assert_eq!(reader.get_news().len(), 2);
        assert!(reader.connection_status().last_update_time.is_none());
    }

    #[test]
    fn test_synthetic_writes_refused_after_live() {
        let store = FeedStore::new(symbols(), 20);
        let reader = store.reader();
        store.apply_live_updates(vec![snapshot("AAPL", 0.5)], Utc::now());

        let tick = SyntheticTick {
            snapshots: vec![snapshot("AAPL", -0.9)],
            news: Some(vec![news("fake")]),
        };
        assert!(!store.apply_synthetic_tick(tick, Utc::now()));

        let frame = SyntheticFrame {
            snapshots: vec![snapshot("MSFT", 0.0)],
            history: vec![],
            news: vec![],
        };
        assert!(!store.apply_synthetic_initial(frame, Utc::now()));

        assert_eq!(reader.get_snapshot("AAPL").map(|s| s.signal), Some(Signal::Buy));
        assert!(reader.get_snapshot("MSFT").is_none());
        assert_eq!(reader.get_history("AAPL").len(), 1);
        assert!(reader.get_news().is_empty());
        assert!(store.is_live_latched());
    }

    #[test]
    fn test_connection_state_flags() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();

        store.set_connection_state(ConnectionState::Synthetic);
        let status = reader.connection_status();
        assert!(status.is_synthetic);
        assert!(!status.is_live);

        store.set_connection_state(ConnectionState::Live);
        let status = reader.connection_status();
        assert!(status.is_live);
        assert!(!status.is_synthetic);
    }

    #[test]
    fn test_set_history_bound_trims() {
        let store = FeedStore::new(symbols(), 50);
        let reader = store.reader();
        for i in 0..40 {
            store.apply_live_updates(vec![snapshot("AAPL", i as f64 / 100.0)], Utc::now());
        }
        store.set_history_bound(20);
        assert_eq!(reader.get_history("AAPL").len(), 20);
        assert_eq!(reader.history_bound(), 20);
    }
}
