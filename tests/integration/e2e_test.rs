//! End-to-end detection cycles: HTTP source -> poll loop -> store -> notifier

use crate::common::{serve_http, RecordingNotifier};
use chrono::{Duration, Utc};
use pumpwatch::alert::{AlertClass, AlertDispatcher};
use pumpwatch::config::Config;
use pumpwatch::dedup::DedupTracker;
use pumpwatch::feed::build_sources;
use pumpwatch::history::{HistoryStore, WindowConfig};
use pumpwatch::poller::{PollConfig, PollLoop};
use pumpwatch::scoring::ScoringEngine;
use pumpwatch::store::InMemoryStore;
use std::io::Write;
use std::sync::Arc;

const TICKERS: &str = r#"[
    {"symbol":"XUSDT","lastPrice":"1.25","priceChangePercent":"40.00","quoteVolume":"5000000","closeTime":1700000000000},
    {"symbol":"CALMUSDT","lastPrice":"3.00","priceChangePercent":"0.50","quoteVolume":"1000000","closeTime":1700000000000}
]"#;

fn config(base_url: &str) -> Config {
    let toml = format!(
        r#"
        [monitor]
        daily_spike_min_pct = 30
        daily_spike_max_pct = 70

        [sources]
        venues = ["binance"]
        fetch_retries = 1
        binance_base_url = "{}"

        [sniper]
        enabled = false

        [[recipients]]
        id = 42

        [telemetry]
        log_level = "warn"
        "#,
        base_url
    );

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    Config::load(file.path()).unwrap()
}

fn poll_loop(
    config: &Config,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
) -> PollLoop {
    let dispatcher = AlertDispatcher::new(notifier, store.clone(), std::time::Duration::ZERO);
    PollLoop::new(
        PollConfig::from(config),
        build_sources(&config.sources).unwrap(),
        Arc::new(HistoryStore::new(WindowConfig::from(&config.history))),
        ScoringEngine::new(config.scoring.clone()),
        Arc::new(DedupTracker::new(&config.dedup)),
        store,
        dispatcher,
    )
}

#[tokio::test]
async fn test_daily_spike_dispatched_once() {
    let (base_url, _log) = serve_http(200, TICKERS).await;
    let config = config(&base_url);
    let store = Arc::new(InMemoryStore::from_recipients(&config.recipients));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poll_loop(&config, store.clone(), notifier.clone());
    let t0 = Utc::now();

    let first = poller.run_cycle(t0).await;
    assert_eq!(first.sources_ok, 1);
    assert_eq!(first.alerts, 1);
    assert_eq!(notifier.count(), 1);

    let alerts = store.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].class, AlertClass::DailySpike);
    assert_eq!(alerts[0].key.symbol(), "XUSDT");

    let (recipient, text) = notifier.sent.lock()[0].clone();
    assert_eq!(recipient, 42);
    assert!(text.contains("XUSDT"));
    assert!(text.contains("https://www.binance.com/en/futures/XUSDT"));

    let second = poller.run_cycle(t0 + Duration::minutes(10)).await;
    assert_eq!(second.sources_ok, 1);
    assert_eq!(second.alerts, 0);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_store_history_survives_restart() {
    let (base_url, _log) = serve_http(200, TICKERS).await;
    let config = config(&base_url);
    let store = Arc::new(InMemoryStore::from_recipients(&config.recipients));
    let notifier = Arc::new(RecordingNotifier::default());
    let t0 = Utc::now();

    let before = poll_loop(&config, store.clone(), notifier.clone());
    before.run_cycle(t0).await;
    assert_eq!(notifier.count(), 1);

    // Fresh in-process state, same store
    let after = poll_loop(&config, store.clone(), notifier.clone());
    let report = after.run_cycle(t0 + Duration::minutes(20)).await;
    assert_eq!(report.alerts, 0);
    assert_eq!(notifier.count(), 1);
    let key = store.alerts()[0].key.clone();
    let dedup = after.dedup();
    assert!(dedup.is_cooling_down(&key, AlertClass::DailySpike, t0 + Duration::minutes(21)));

    // Past the threshold cooldown the spike is reported again
    let later = after.run_cycle(t0 + Duration::minutes(61)).await;
    assert_eq!(later.alerts, 1);
    assert_eq!(notifier.count(), 2);
}

#[tokio::test]
async fn test_store_outage_suppresses_alerts() {
    let (base_url, _log) = serve_http(200, TICKERS).await;
    let config = config(&base_url);
    let store = Arc::new(InMemoryStore::from_recipients(&config.recipients));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poll_loop(&config, store.clone(), notifier.clone());

    store.set_unavailable(true);
    let report = poller.run_cycle(Utc::now()).await;
    assert_eq!(report.tickers, 2);
    assert_eq!(report.alerts, 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_unreachable_source_is_skipped() {
    let (base_url, _log) = serve_http(502, "bad gateway").await;
    let config = config(&base_url);
    let store = Arc::new(InMemoryStore::from_recipients(&config.recipients));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poll_loop(&config, store, notifier.clone());

    let report = poller.run_cycle(Utc::now()).await;
    assert!(report.all_sources_failed());
    assert_eq!(report.tickers, 0);
    assert_eq!(notifier.count(), 0);
}
