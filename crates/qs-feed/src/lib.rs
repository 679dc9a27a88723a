//! Sentiment feed state for the quant sentiment dashboard.
//!
//! Holds everything the presentation layer reads:
//! - `HistoryBuffer`: Bounded per-symbol history (FIFO eviction)
//! - `FeedStore`: Snapshot store, news list and connection status (writer side)
//! - `FeedReader`: Cloneable read-only view of the store
//! - `SyntheticFeed`: Seeded generator used while no live stream is available

pub mod history;
pub mod store;
pub mod synthetic;

pub use history::HistoryBuffer;
pub use store::{FeedReader, FeedStore};
pub use synthetic::{SyntheticConfig, SyntheticFeed, SyntheticFrame, SyntheticTick};
