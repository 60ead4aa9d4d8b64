//! Market data sources against a local HTTP server

use crate::common::serve_http;
use pumpwatch::error::SourceError;
use pumpwatch::feed::{
    fetch_movers, fetch_with_retry, BinanceFuturesSource, MarketDataSource, MexcFuturesSource,
    MoveDirection, RetryPolicy,
};
use pumpwatch::instrument::Venue;
use reqwest::Client;
use rust_decimal_macros::dec;
use std::time::Duration;

const BINANCE_BODY: &str = r#"[
    {"symbol":"BTCUSDT","lastPrice":"42000.10","priceChangePercent":"1.20","quoteVolume":"9000000000","closeTime":1700000000000},
    {"symbol":"PEPEUSDT","lastPrice":"0.0000123","priceChangePercent":"38.50","quoteVolume":"120000000","closeTime":1700000000000},
    {"symbol":"WIFUSDT","lastPrice":"2.51","priceChangePercent":"12.00","quoteVolume":"80000000","closeTime":1700000000000},
    {"symbol":"DOGEUSDT","lastPrice":"0.08","priceChangePercent":"-9.75","quoteVolume":"60000000","closeTime":1700000000000},
    {"symbol":"BTCUSD_PERP","lastPrice":"42000","priceChangePercent":"50.00","quoteVolume":"1","closeTime":1700000000000}
]"#;

const MEXC_BODY: &str = r#"{"success":true,"code":0,"data":[
    {"symbol":"SOL_USDT","lastPrice":98.5,"riseFallRate":-0.1210,"amount24":5000000,"timestamp":1700000000000},
    {"symbol":"ARB_USDT","lastPrice":1.1,"riseFallRate":-0.0300,"amount24":900000,"timestamp":1700000000000},
    {"symbol":"TIA_USDT","lastPrice":9.9,"riseFallRate":0.2500,"amount24":700000,"timestamp":1700000000000}
]}"#;

fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        initial_delay: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_binance_top_gainers() {
    let (base_url, log) = serve_http(200, BINANCE_BODY).await;
    let source = BinanceFuturesSource::new(Client::new(), Some(&base_url));

    let gainers = source
        .fetch_top_movers(MoveDirection::Gainers, 2)
        .await
        .unwrap();
    let symbols: Vec<_> = gainers.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["PEPEUSDT", "WIFUSDT"]);
    assert_eq!(gainers[0].venue, Venue::Binance);
    assert_eq!(gainers[0].change_24h, dec!(38.50));

    assert_eq!(*log.lock(), vec!["/fapi/v1/ticker/24hr".to_string()]);
}

#[tokio::test]
async fn test_mexc_top_losers() {
    let (base_url, log) = serve_http(200, MEXC_BODY).await;
    let source = MexcFuturesSource::new(Client::new(), Some(&base_url));

    let losers = source
        .fetch_top_movers(MoveDirection::Losers, 10)
        .await
        .unwrap();
    let symbols: Vec<_> = losers.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["SOLUSDT", "ARBUSDT"]);
    assert_eq!(losers[0].change_24h, dec!(-12.10));
    assert_eq!(*log.lock(), vec!["/api/v1/contract/ticker".to_string()]);
}

#[tokio::test]
async fn test_fetch_movers_merges_both_ends() {
    let (base_url, log) = serve_http(200, BINANCE_BODY).await;
    let source = BinanceFuturesSource::new(Client::new(), Some(&base_url));

    let movers = fetch_movers(&source, 1, &policy(1)).await.unwrap();
    let mut symbols: Vec<_> = movers.iter().map(|t| t.symbol.clone()).collect();
    symbols.sort();
    assert_eq!(symbols, vec!["DOGEUSDT", "PEPEUSDT"]);
    assert_eq!(log.lock().len(), 2);
}

#[tokio::test]
async fn test_http_error_is_retried_then_reported() {
    let (base_url, log) = serve_http(503, r#"{"code":-1,"msg":"busy"}"#).await;
    let source = BinanceFuturesSource::new(Client::new(), Some(&base_url));

    let result = fetch_with_retry(&source, MoveDirection::Gainers, 5, &policy(2)).await;
    match result {
        Err(SourceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert!(body.contains("busy"));
        }
        other => panic!("expected status error, got {:?}", other.map(|t| t.len())),
    }
    assert_eq!(log.lock().len(), 2);
}

#[tokio::test]
async fn test_malformed_body() {
    let (base_url, _log) = serve_http(200, "<html>maintenance</html>").await;
    let source = MexcFuturesSource::new(Client::new(), Some(&base_url));

    let result = source.fetch_top_movers(MoveDirection::Gainers, 5).await;
    assert!(matches!(result, Err(SourceError::Malformed(_))));
}
