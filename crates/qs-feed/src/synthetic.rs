//! Synthetic sentiment feed.
//!
//! Generates data with exactly the shape of the live stream so the
//! dashboard is never empty while no live session is available. Values are
//! drawn from a seedable RNG; every signal goes through
//! `Signal::from_sentiment`, the same rule applied to live data.

use crate::store::FeedStore;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use qs_core::{HistoryPoint, NewsItem, SentimentSnapshot, Symbol};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::debug;

/// Number of news items per synthetic batch.
pub const NEWS_BATCH_SIZE: usize = 5;

/// Number of backfilled history points per symbol on initialization.
pub const BACKFILL_POINTS: usize = 20;

/// Snapshot sentiment is drawn from `[-SENTIMENT_RANGE, SENTIMENT_RANGE)`.
const SENTIMENT_RANGE: f64 = 0.8;
/// Backfilled history sentiment range.
const BACKFILL_SENTIMENT_RANGE: f64 = 0.7;
/// News sentiment score range.
const NEWS_SCORE_RANGE: f64 = 0.75;
const CONFIDENCE_MIN: f64 = 0.7;
const CONFIDENCE_MAX: f64 = 1.0;
/// Score beyond which a news item is labelled positive/negative.
const NEWS_LABEL_THRESHOLD: f64 = 0.1;
/// Synthetic news is published within this window before "now".
const NEWS_MAX_AGE_MS: i64 = 86_400_000;
const MAX_NEWS_SYMBOLS: usize = 3;

const HEADLINES: [&str; 8] = [
    "Tech Giants Report Strong Q4 Earnings Beating Expectations",
    "Federal Reserve Signals Potential Interest Rate Changes",
    "AI Sector Shows Unprecedented Growth in Market Valuation",
    "Market Volatility Decreases Following Positive Policy Changes",
    "Energy Stocks Surge on Supply Chain Improvements",
    "Healthcare Innovation Drives Strong Sector Performance",
    "Cryptocurrency Market Shows Signs of Long-term Stabilization",
    "Retail Earnings Beat Analyst Expectations Across Board",
];

const SOURCES: [&str; 5] = [
    "Reuters",
    "Bloomberg",
    "CNBC",
    "Wall Street Journal",
    "MarketWatch",
];

const NEWS_SUMMARY: &str = "Market analysis reveals significant developments in key sectors \
with potential implications for investors and market dynamics moving forward. Expert analysts \
provide insights into emerging trends.";

/// Synthetic feed configuration.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Probability that a tick also refreshes the news batch.
    pub news_refresh_probability: f64,
    /// RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            news_refresh_probability: 0.2,
            seed: None,
        }
    }
}

/// Full synthetic state written when an episode begins.
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    pub snapshots: Vec<SentimentSnapshot>,
    pub history: Vec<(Symbol, Vec<HistoryPoint>)>,
    pub news: Vec<NewsItem>,
}

/// Incremental synthetic update produced by one tick.
#[derive(Debug, Clone)]
pub struct SyntheticTick {
    pub snapshots: Vec<SentimentSnapshot>,
    /// Present only on the ticks that refresh news.
    pub news: Option<Vec<NewsItem>>,
}

/// Seeded generator of sentiment snapshots, history and news.
pub struct SyntheticFeed {
    symbols: Vec<Symbol>,
    rng: StdRng,
    news_refresh_probability: f64,
}

impl SyntheticFeed {
    /// Create a generator for the tracked symbols.
    pub fn new(symbols: Vec<Symbol>, config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            symbols,
            rng,
            news_refresh_probability: config.news_refresh_probability.clamp(0.0, 1.0),
        }
    }

    /// Draw one snapshot: sentiment in ±0.8, confidence in [0.7, 1.0].
    pub fn sample_sentiment(&mut self, symbol: &Symbol, now: DateTime<Utc>) -> SentimentSnapshot {
        let sentiment = round3(self.rng.random_range(-SENTIMENT_RANGE..SENTIMENT_RANGE));
        let confidence = self.sample_confidence();
        SentimentSnapshot::derived(symbol.clone(), sentiment, confidence, now)
    }

    /// Draw a batch of news items.
    pub fn sample_news_batch(&mut self, now: DateTime<Utc>) -> Vec<NewsItem> {
        (0..NEWS_BATCH_SIZE)
            .map(|_| self.sample_news_item(now))
            .collect()
    }

    /// Build the frame written when a synthetic episode begins.
    ///
    /// Every tracked symbol gets a snapshot and a backfilled series of
    /// `BACKFILL_POINTS` points spaced one minute apart, ending at `now`.
    pub fn initial_frame(&mut self, now: DateTime<Utc>) -> SyntheticFrame {
        let symbols = self.symbols.clone();
        let mut snapshots = Vec::with_capacity(symbols.len());
        let mut history = Vec::with_capacity(symbols.len());

        for symbol in &symbols {
            snapshots.push(self.sample_sentiment(symbol, now));
            history.push((symbol.clone(), self.backfill(now)));
        }

        SyntheticFrame {
            snapshots,
            history,
            news: self.sample_news_batch(now),
        }
    }

    /// Build the next tick: a fresh snapshot per symbol and, occasionally, news.
    pub fn next_tick(&mut self, now: DateTime<Utc>) -> SyntheticTick {
        let symbols = self.symbols.clone();
        let snapshots = symbols
            .iter()
            .map(|symbol| self.sample_sentiment(symbol, now))
            .collect();
        let news = if self.rng.random_bool(self.news_refresh_probability) {
            Some(self.sample_news_batch(now))
        } else {
            None
        };
        SyntheticTick { snapshots, news }
    }

    /// Write a fresh initial frame into `store`. Returns `false` if the store refused it.
    pub fn initialize(&mut self, store: &FeedStore, now: DateTime<Utc>) -> bool {
        let frame = self.initial_frame(now);
        let written = store.apply_synthetic_initial(frame, now);
        debug!(written, symbols = self.symbols.len(), "Synthetic feed initialized");
        written
    }

    /// Write one tick into `store`. Returns `false` if the store refused it.
    pub fn tick(&mut self, store: &FeedStore, now: DateTime<Utc>) -> bool {
        let tick = self.next_tick(now);
        let refreshed_news = tick.news.is_some();
        let written = store.apply_synthetic_tick(tick, now);
        debug!(written, refreshed_news, "Synthetic tick");
        written
    }

    fn backfill(&mut self, now: DateTime<Utc>) -> Vec<HistoryPoint> {
        (0..BACKFILL_POINTS)
            .map(|i| {
                let minutes_ago = (BACKFILL_POINTS - 1 - i) as i64;
                let at = now - Duration::minutes(minutes_ago);
                let sentiment = round3(
                    self.rng
                        .random_range(-BACKFILL_SENTIMENT_RANGE..BACKFILL_SENTIMENT_RANGE),
                );
                let confidence = self.sample_confidence();
                HistoryPoint::new(at, sentiment, confidence)
            })
            .collect()
    }

    fn sample_news_item(&mut self, now: DateTime<Utc>) -> NewsItem {
        let title = HEADLINES.choose(&mut self.rng).copied().unwrap_or(HEADLINES[0]);
        let source = SOURCES.choose(&mut self.rng).copied().unwrap_or(SOURCES[0]);
        let age_ms = self.rng.random_range(0..NEWS_MAX_AGE_MS);
        let published = (now - Duration::milliseconds(age_ms))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let sentiment_score = round3(self.rng.random_range(-NEWS_SCORE_RANGE..NEWS_SCORE_RANGE));

        NewsItem {
            title: title.to_string(),
            summary: NEWS_SUMMARY.to_string(),
            published,
            source: source.to_string(),
            sentiment_score,
            sentiment_label: news_label(sentiment_score).to_string(),
            symbols: self.sample_news_symbols(),
        }
    }

    /// Random non-empty subset of 1..=3 tracked symbols.
    fn sample_news_symbols(&mut self) -> BTreeSet<Symbol> {
        if self.symbols.is_empty() {
            return BTreeSet::new();
        }
        let max = MAX_NEWS_SYMBOLS.min(self.symbols.len());
        let count = self.rng.random_range(1..=max);
        self.symbols
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect()
    }

    fn sample_confidence(&mut self) -> f64 {
        round3(self.rng.random_range(CONFIDENCE_MIN..=CONFIDENCE_MAX))
    }
}

fn news_label(score: f64) -> &'static str {
    if score > NEWS_LABEL_THRESHOLD {
        "positive"
    } else if score < -NEWS_LABEL_THRESHOLD {
        "negative"
    } else {
        "neutral"
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
