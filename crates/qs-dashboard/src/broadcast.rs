//! WebSocket broadcast functionality.
//!
//! The broadcaster collects state at a fixed interval and broadcasts it to
//! all connected WebSocket clients.

use std::time::Duration;

use qs_core::NewsItem;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

/// Run the broadcaster task.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    let mut last_news: Option<Vec<NewsItem>> = None;

    loop {
        interval.tick().await;

        let msg = next_update(&state, &mut last_news);
        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => {
                    trace!(receivers = n, "Broadcast update sent");
                }
                Err(_) => {
                    trace!("No WebSocket receivers connected");
                }
            },
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
            }
        }
    }
}

/// Build the next update, carrying news only when it changed.
fn next_update(state: &DashboardState, last_news: &mut Option<Vec<NewsItem>>) -> DashboardMessage {
    let snapshot = state.collect_snapshot();
    let news = if last_news.as_ref() == Some(&snapshot.news) {
        None
    } else {
        *last_news = Some(snapshot.news.clone());
        Some(snapshot.news)
    };

    DashboardMessage::Update {
        timestamp_ms: snapshot.timestamp_ms,
        connection: snapshot.connection,
        sentiment: snapshot.sentiment,
        news,
    }
}
