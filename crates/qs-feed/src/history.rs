//! Bounded per-symbol history.
//!
//! Each series is a FIFO window: points are only ever appended at the back
//! and evicted from the front, so insertion order is the only notion of
//! recency.

use qs_core::{HistoryPoint, Symbol};
use std::collections::{HashMap, VecDeque};

/// Per-symbol sliding window of history points.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    bound: usize,
    series: HashMap<Symbol, VecDeque<HistoryPoint>>,
}

impl HistoryBuffer {
    /// Create an empty buffer retaining at most `bound` points per symbol.
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            series: HashMap::new(),
        }
    }

    /// Current eviction threshold.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Append `point` to `symbol`'s series, evicting the oldest points past the bound.
    pub fn append(&mut self, symbol: &Symbol, point: HistoryPoint) {
        let bound = self.bound;
        let series = self.series.entry(symbol.clone()).or_default();
        series.push_back(point);
        trim_front(series, bound);
    }

    /// Change the bound and immediately trim every series that exceeds it.
    pub fn set_bound(&mut self, bound: usize) {
        self.bound = bound;
        for series in self.series.values_mut() {
            trim_front(series, bound);
        }
    }

    /// Replace `symbol`'s series, keeping only the most recent `bound` points.
    pub fn replace(&mut self, symbol: &Symbol, points: Vec<HistoryPoint>) {
        let mut series: VecDeque<HistoryPoint> = points.into();
        trim_front(&mut series, self.bound);
        self.series.insert(symbol.clone(), series);
    }

    /// Copy of `symbol`'s series, oldest first. Empty if the symbol is unknown.
    pub fn get(&self, symbol: &str) -> Vec<HistoryPoint> {
        self.series
            .get(symbol)
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of points currently held for `symbol`.
    pub fn len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map_or(0, VecDeque::len)
    }

    /// Drop every series.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(qs_core::LIVE_HISTORY_BOUND)
    }
}

fn trim_front(series: &mut VecDeque<HistoryPoint>, bound: usize) {
    while series.len() > bound {
        series.pop_front();
    }
}
