//! Live order book subscriptions against a local WebSocket server

use crate::common::wait_for;
use futures_util::{SinkExt, StreamExt};
use pumpwatch::instrument::Venue;
use pumpwatch::subscription::{
    Activation, ConnectionState, SubscriptionConfig, SubscriptionManager,
};
use pumpwatch::venue::{BinanceStream, MexcStream};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const DEPTH: &str = r#"{"stream":"btcusdt@depth20@100ms","data":{"e":"depthUpdate","E":1700000000000,"b":[["100.0","3"],["99.9","3"]],"a":[["100.1","2"]]}}"#;

fn fast_config(max_subscriptions: usize) -> SubscriptionConfig {
    SubscriptionConfig {
        max_subscriptions,
        subscribe_gap: Duration::ZERO,
        reconnect_delay: Duration::from_millis(50),
        read_timeout: Duration::from_secs(5),
        imbalance_depth: 20,
    }
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_request(ws: &mut WebSocketStream<TcpStream>) -> Value {
    let read = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {:?}", other),
            }
        }
    };
    let text = timeout(Duration::from_secs(5), read).await.unwrap();
    serde_json::from_str(&text).unwrap()
}

fn binance_manager(url: &str, max_subscriptions: usize) -> SubscriptionManager {
    let stream = BinanceStream::with_url(url);
    SubscriptionManager::new(fast_config(max_subscriptions), vec![Arc::new(stream)])
}

#[tokio::test]
async fn test_desired_subscription_sent_on_connect() {
    let (listener, url) = listen().await;
    let manager = binance_manager(&url, 10);

    // Recorded before any connection exists
    assert_eq!(
        manager.subscribe(Venue::Binance, "BTCUSDT").await,
        Activation::Added { evicted: None }
    );
    manager.start();

    let mut ws = accept(&listener).await;
    let request = next_request(&mut ws).await;
    assert_eq!(request["method"], "SUBSCRIBE");
    assert_eq!(request["params"][0], "btcusdt@depth20@100ms");

    ws.send(Message::Text(DEPTH.to_string())).await.unwrap();
    let cached = || manager.buy_pressure(Venue::Binance, "BTCUSDT").is_some();
    assert!(wait_for(cached).await);
    assert_eq!(manager.imbalance(Venue::Binance, "btcusdt"), dec!(75));
    assert_eq!(
        manager.state(Venue::Binance),
        Some(ConnectionState::Receiving)
    );

    let subscriptions = manager.subscriptions(Venue::Binance);
    assert_eq!(subscriptions[0].symbol, "btcusdt");
    assert!(subscriptions[0].last_activity.is_some());

    manager.shutdown().await;
    assert_eq!(
        manager.state(Venue::Binance),
        Some(ConnectionState::Disconnected)
    );
}

#[tokio::test]
async fn test_books_for_unsubscribed_symbols_are_ignored() {
    let (listener, url) = listen().await;
    let manager = binance_manager(&url, 10);
    manager.start();

    let mut ws = accept(&listener).await;
    ws.send(Message::Text(DEPTH.to_string())).await.unwrap();
    let ack = r#"{"result":null,"id":1}"#.to_string();
    ws.send(Message::Text(ack)).await.unwrap();

    let receiving = || manager.state(Venue::Binance) == Some(ConnectionState::Receiving);
    assert!(wait_for(receiving).await);
    assert!(manager.cache().is_empty());
    assert_eq!(manager.imbalance(Venue::Binance, "btcusdt"), dec!(50));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_resubscribe_after_server_drop() {
    let (listener, url) = listen().await;
    let manager = binance_manager(&url, 10);
    manager.start();

    let mut first = accept(&listener).await;
    let open = || manager.state(Venue::Binance).is_some_and(|s| s.is_open());
    assert!(wait_for(open).await);

    manager.subscribe(Venue::Binance, "ethusdt").await;
    let request = next_request(&mut first).await;
    assert_eq!(request["params"][0], "ethusdt@depth20@100ms");

    first.close(None).await.unwrap();
    drop(first);

    let mut second = accept(&listener).await;
    let request = next_request(&mut second).await;
    assert_eq!(request["method"], "SUBSCRIBE");
    assert_eq!(request["params"][0], "ethusdt@depth20@100ms");
    assert_eq!(manager.active_symbols(Venue::Binance), vec!["ethusdt"]);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_eviction_unsubscribes_oldest() {
    let (listener, url) = listen().await;
    let stream = MexcStream::with_url(&url);
    let manager = SubscriptionManager::new(fast_config(1), vec![Arc::new(stream)]);
    manager.start();

    let mut ws = accept(&listener).await;
    let open = || manager.state(Venue::Mexc).is_some_and(|s| s.is_open());
    assert!(wait_for(open).await);

    manager.subscribe(Venue::Mexc, "WIFUSDT").await;
    let activation = manager.subscribe(Venue::Mexc, "PEPEUSDT").await;
    assert_eq!(
        activation,
        Activation::Added {
            evicted: Some("wifusdt".to_string())
        }
    );

    let requests = [
        next_request(&mut ws).await,
        next_request(&mut ws).await,
        next_request(&mut ws).await,
    ];
    assert_eq!(requests[0]["method"], "sub.depth");
    assert_eq!(requests[0]["param"]["symbol"], "WIF_USDT");
    assert_eq!(requests[1]["method"], "unsub.depth");
    assert_eq!(requests[1]["param"]["symbol"], "WIF_USDT");
    assert_eq!(requests[2]["method"], "sub.depth");
    assert_eq!(requests[2]["param"]["symbol"], "PEPE_USDT");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_keepalive_pings_while_connected() {
    let (listener, url) = listen().await;
    let stream = MexcStream::with_url(&url).with_ping_interval(Duration::from_millis(100));
    let manager = SubscriptionManager::new(fast_config(10), vec![Arc::new(stream)]);
    manager.start();

    let mut ws = accept(&listener).await;
    for _ in 0..3 {
        let request = next_request(&mut ws).await;
        assert_eq!(request["method"], "ping");
    }

    manager.shutdown().await;
}
