//! Core domain types for the quant sentiment feed.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Symbol`: Opaque instrument identifier (e.g. "AAPL")
//! - `Signal`: BUY/SELL/HOLD label derived from a sentiment scalar
//! - `SentimentSnapshot`, `HistoryPoint`: Per-symbol observations
//! - `NewsItem`: News entries tagged with the symbols they mention
//! - `ConnectionState`, `ConnectionStatus`: Controller mode as seen by readers

pub mod connection;
pub mod error;
pub mod news;
pub mod sentiment;
pub mod symbol;

pub use connection::{ConnectionState, ConnectionStatus};
pub use error::{CoreError, Result};
pub use news::NewsItem;
pub use sentiment::{
    HistoryPoint, SentimentSnapshot, Signal, LIVE_HISTORY_BOUND, SIGNAL_THRESHOLD,
    SYNTHETIC_HISTORY_BOUND,
};
pub use symbol::Symbol;
