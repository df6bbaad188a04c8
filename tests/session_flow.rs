use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{DuplexStream, duplex};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{WebSocketStream, client_async};
use vanguard::application::agents::{AgentFactory, AgentSettings};
use vanguard::application::strategies::CrossoverRsiStrategy;
use vanguard::domain::errors::MarketDataError;
use vanguard::domain::trading::types::OrderSide;
use vanguard::infrastructure::mock::{MockExecutionService, MockMarketDataService};
use vanguard::interfaces::handle_connection;

type Client = WebSocketStream<DuplexStream>;

/// 30 flat closes, a decline, then a saw-tooth recovery ending on a bullish
/// SMA(20)/SMA(50) crossover at 96 with RSI(14) around 60.
fn bullish_recovery() -> Vec<f64> {
    let mut closes = vec![100.0; 30];
    closes.extend((1..=20).map(|i| 100.0 - i as f64));
    let mut last = 80.0;
    for k in 0..27 {
        last += if k % 2 == 0 { 3.0 } else { -2.0 };
        closes.push(last);
    }
    closes
}

fn factory(market: &MockMarketDataService, execution: &MockExecutionService) -> AgentFactory {
    AgentFactory::new(
        Arc::new(market.clone()),
        Arc::new(execution.clone()),
        Arc::new(CrossoverRsiStrategy::default()),
        AgentSettings::default(),
    )
}

async fn connect(factory: AgentFactory) -> Client {
    let (client_io, server_io) = duplex(64 * 1024);
    tokio::spawn(handle_connection(server_io, factory));
    let (ws, _) = client_async("ws://localhost/", client_io)
        .await
        .expect("handshake should succeed");
    ws
}

async fn send(ws: &mut Client, message: Value) {
    ws.send(Message::text(message.to_string()))
        .await
        .expect("send should succeed");
}

async fn next_envelope(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(600), ws.next())
            .await
            .expect("no frame in time")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("frame should be JSON");
        }
    }
}

async fn next_of_type(ws: &mut Client, kind: &str) -> (Value, Vec<Value>) {
    let mut seen = Vec::new();
    loop {
        let envelope = next_envelope(ws).await;
        if envelope["type"] == kind {
            return (envelope, seen);
        }
        seen.push(envelope);
    }
}

fn start(symbols: &[&str]) -> Value {
    json!({
        "type": "start",
        "payload": {
            "symbols": symbols,
            "riskPerTrade": 1.0,
            "riskRewardRatio": 2.0,
            "timeBasedExit": 0
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_failing_symbol_does_not_block_the_next() {
    let market = MockMarketDataService::new();
    market.set_closes("AAPL", &bullish_recovery()).await;
    market
        .fail_symbol(
            "BROKEN",
            MarketDataError::NoData {
                symbol: "BROKEN".to_string(),
            },
        )
        .await;
    let execution = MockExecutionService::new(dec!(10000));

    let mut ws = connect(factory(&market, &execution)).await;
    send(&mut ws, start(&["BROKEN", "AAPL"])).await;

    let (update, before) = next_of_type(&mut ws, "position_update").await;

    let fetch_error = before
        .iter()
        .find(|e| e["type"] == "error")
        .expect("the failing symbol should be reported");
    assert_eq!(fetch_error["payload"]["category"], "data_fetch");
    assert_eq!(fetch_error["payload"]["symbol"], "BROKEN");
    assert_eq!(fetch_error["payload"]["transient"], false);

    assert_eq!(update["payload"][0]["symbol"], "AAPL");
    assert_eq!(update["payload"][0]["side"], "long");

    let orders = execution.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol, "AAPL");
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].stop_loss, Some(dec!(94.08)));
    assert_eq!(orders[0].take_profit, Some(dec!(99.84)));
    assert_eq!(market.fetch_count("BROKEN").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_replaces_running_agent() {
    let market = MockMarketDataService::new();
    let execution = MockExecutionService::new(dec!(10000));
    let mut ws = connect(factory(&market, &execution)).await;

    send(&mut ws, start(&["AAPL"])).await;
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "running");

    send(&mut ws, start(&["MSFT"])).await;
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "stopped");
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "running");

    send(&mut ws, json!({"type": "stop"})).await;
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "stopped");
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start_is_reported() {
    let market = MockMarketDataService::new();
    let execution = MockExecutionService::new(dec!(10000));
    let mut ws = connect(factory(&market, &execution)).await;

    send(&mut ws, json!({"type": "stop", "payload": {}})).await;
    let envelope = next_envelope(&mut ws).await;
    assert_eq!(envelope["type"], "log");
    assert_eq!(envelope["payload"], "Agent is not running.");
}

#[tokio::test(start_paused = true)]
async fn test_bad_messages_keep_session_open() {
    let market = MockMarketDataService::new();
    let execution = MockExecutionService::new(dec!(10000));
    let mut ws = connect(factory(&market, &execution)).await;

    send(&mut ws, json!({"type": "pause"})).await;
    let (error, _) = next_of_type(&mut ws, "error").await;
    assert_eq!(error["payload"]["category"], "invalid_command");

    send(
        &mut ws,
        json!({"type": "start", "payload": {"symbols": ["AAPL"], "riskPerTrade": 150, "riskRewardRatio": 2}}),
    )
    .await;
    let (error, _) = next_of_type(&mut ws, "error").await;
    assert_eq!(error["payload"]["category"], "invalid_config");

    send(&mut ws, start(&["AAPL"])).await;
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "running");
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_agent() {
    let market = MockMarketDataService::new();
    market.set_closes("AAPL", &bullish_recovery()).await;
    let execution = MockExecutionService::new(dec!(10000));
    let mut ws = connect(factory(&market, &execution)).await;

    send(&mut ws, start(&["AAPL"])).await;
    let (status, _) = next_of_type(&mut ws, "status").await;
    assert_eq!(status["payload"]["state"], "running");

    ws.close(None).await.expect("close should succeed");
    drop(ws);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(market.fetch_count("AAPL").await, 0);
    assert!(execution.orders().await.is_empty());
}
