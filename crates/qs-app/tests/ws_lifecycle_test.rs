//! Live session lifecycle against a real WebSocket server.
//!
//! Covers:
//! - Initial data reaching the store through `WsConnector`
//! - Live updates and malformed frames on an open session
//! - Reconnect after the server closes, with stale data kept visible

mod integration;
use integration::common::mock_ws::MockWsServer;

use std::time::Duration;

use qs_app::{Controller, ControllerConfig};
use qs_core::{ConnectionState, Signal, Symbol};
use qs_feed::{FeedReader, SyntheticConfig};
use qs_ws::{ConnectionConfig, WsConnector};
use serde_json::json;
use tokio::time::timeout;

fn controller_config() -> ControllerConfig {
    ControllerConfig {
        tracked: vec![Symbol::from("AAPL"), Symbol::from("MSFT")],
        reconnect_delay: Duration::from_millis(200),
        fallback_guard: Duration::from_secs(2),
        tick_interval: Duration::from_secs(10),
        live_history_bound: 50,
        synthetic_history_bound: 20,
        synthetic: SyntheticConfig {
            news_refresh_probability: 0.2,
            seed: Some(1),
        },
    }
}

fn initial_data() -> String {
    json!({
        "type": "initial_data",
        "sentiment": {
            "AAPL": {
                "symbol": "AAPL",
                "sentiment": 0.5,
                "confidence": 0.9,
                "signal": "BUY",
                "timestamp": "2024-03-01T12:00:00Z"
            }
        },
        "news": [{
            "title": "Tech Giants Report Strong Q4 Earnings Beating Expectations",
            "summary": "",
            "published": "2024-03-01T11:00:00Z",
            "source": "Reuters",
            "sentiment_score": 0.4,
            "sentiment_label": "positive",
            "symbols": ["AAPL"]
        }]
    })
    .to_string()
}

/// Poll `check` until it holds or `limit` elapses.
async fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    timeout(limit, async {
        loop {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}

fn connector_for(server: &MockWsServer) -> WsConnector {
    WsConnector::new(ConnectionConfig {
        url: server.url(),
        connect_timeout_ms: 2000,
    })
}

fn is_live(reader: &FeedReader) -> bool {
    reader.connection_status().is_live
}

#[tokio::test]
async fn test_initial_data_reaches_store() {
    let server = MockWsServer::start(vec![initial_data()]).await;
    let handle = Controller::spawn(controller_config(), connector_for(&server));
    let reader = handle.reader();

    assert!(
        wait_for(Duration::from_secs(3), || reader.get_snapshot("AAPL").is_some()).await,
        "initial data should arrive"
    );

    let snapshot = reader.get_snapshot("AAPL").unwrap();
    assert_eq!(snapshot.signal, Signal::Buy);
    assert_eq!(snapshot.sentiment, 0.5);
    assert_eq!(reader.get_news().len(), 1);

    let status = reader.connection_status();
    assert!(status.is_live);
    assert!(!status.is_synthetic);
    assert!(status.last_update_time.is_some());

    handle.shutdown().await;
    assert_eq!(reader.connection_status().state, ConnectionState::Stopped);
    server.shutdown().await;
}

#[tokio::test]
async fn test_updates_and_malformed_frames() {
    let server = MockWsServer::start(vec![initial_data()]).await;
    let handle = Controller::spawn(controller_config(), connector_for(&server));
    let reader = handle.reader();

    assert!(wait_for(Duration::from_secs(3), || is_live(&reader)).await);

    server.push("{ this is not json");
    server.push(json!({"type": "heartbeat"}).to_string());
    server.push(
        json!({
            "type": "sentiment_update",
            "data": [{"symbol": "MSFT", "sentiment": -0.6, "confidence": 0.8}]
        })
        .to_string(),
    );

    assert!(
        wait_for(Duration::from_secs(3), || reader.get_snapshot("MSFT").is_some()).await,
        "update after malformed frame should still apply"
    );
    assert_eq!(reader.get_snapshot("MSFT").unwrap().signal, Signal::Sell);
    assert_eq!(reader.get_history("MSFT").len(), 1);
    assert!(is_live(&reader));

    handle.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start(vec![initial_data()]).await;
    let handle = Controller::spawn(controller_config(), connector_for(&server));
    let reader = handle.reader();

    assert!(wait_for(Duration::from_secs(3), || is_live(&reader)).await);
    assert_eq!(server.connection_count(), 1);

    server.close_all();

    assert!(
        wait_for(Duration::from_secs(3), || server.connection_count() >= 2).await,
        "controller should open a new session after the retry delay"
    );
    assert!(wait_for(Duration::from_secs(3), || is_live(&reader)).await);

    // Live data was received, so synthetic never took over.
    assert!(!reader.connection_status().is_synthetic);
    assert!(reader.get_history("MSFT").is_empty());
    assert_eq!(reader.get_snapshot("AAPL").unwrap().signal, Signal::Buy);

    handle.shutdown().await;
    server.shutdown().await;
}
