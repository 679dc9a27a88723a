//! News entries.

use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A news item with its sentiment score and the symbols it mentions.
///
/// The news list is never windowed: every update replaces it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Publication time as delivered by the source (ISO-8601).
    pub published: String,
    #[serde(default)]
    pub source: String,
    pub sentiment_score: f64,
    #[serde(default)]
    pub sentiment_label: String,
    #[serde(default)]
    pub symbols: BTreeSet<Symbol>,
}
