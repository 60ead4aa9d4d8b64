//! Alert fan-out against the in-memory store

use crate::common::{recipient, RecordingNotifier};
use chrono::Utc;
use pumpwatch::alert::{Alert, AlertClass, AlertDispatcher, DispatchReport};
use pumpwatch::config::RecipientConfig;
use pumpwatch::instrument::{InstrumentKey, Venue};
use pumpwatch::store::InMemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn spike(venue: Venue) -> Alert {
    let key = InstrumentKey::new("MOONUSDT", venue);
    let url = venue.trade_url(key.symbol());
    Alert::new(
        key,
        AlertClass::DailySpike,
        dec!(0.42),
        dec!(45),
        dec!(45),
        dec!(3200000),
        url,
        Utc::now(),
    )
}

fn recipients() -> Vec<RecipientConfig> {
    vec![
        recipient(1),
        RecipientConfig {
            banned: true,
            ..recipient(2)
        },
        RecipientConfig {
            alert_venues: Some(vec![Venue::Mexc]),
            ..recipient(3)
        },
        RecipientConfig {
            disabled_classes: vec![AlertClass::DailySpike],
            ..recipient(4)
        },
        recipient(5),
        recipient(6),
    ]
}

#[tokio::test]
async fn test_preferences_and_failures() {
    let store = Arc::new(InMemoryStore::from_recipients(&recipients()));
    let notifier = Arc::new(RecordingNotifier::failing_for(&[5]));
    let dispatcher = AlertDispatcher::new(notifier.clone(), store, Duration::ZERO);

    let report = dispatcher.dispatch_to_enabled(&spike(Venue::Binance)).await;
    assert_eq!(
        report,
        DispatchReport {
            delivered: 2,
            skipped: 3,
            failed: 1,
        }
    );
    // The failure for 5 did not stop delivery to 6
    assert_eq!(notifier.recipients(), vec![1, 6]);
}

#[tokio::test]
async fn test_venue_filter_admits_matching_venue() {
    let store = Arc::new(InMemoryStore::from_recipients(&recipients()));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = AlertDispatcher::new(notifier.clone(), store, Duration::ZERO);

    dispatcher.dispatch_to_enabled(&spike(Venue::Mexc)).await;
    assert_eq!(notifier.recipients(), vec![1, 3, 5, 6]);
}

#[tokio::test]
async fn test_disabled_class_only_blocks_that_class() {
    let store = Arc::new(InMemoryStore::from_recipients(&[RecipientConfig {
        disabled_classes: vec![AlertClass::DailySpike],
        ..recipient(4)
    }]));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = AlertDispatcher::new(notifier.clone(), store, Duration::ZERO);

    let key = InstrumentKey::new("MOONUSDT", Venue::Binance);
    let pump = Alert::new(
        key.clone(),
        AlertClass::Pump5m,
        dec!(0.42),
        dec!(7.5),
        dec!(45),
        dec!(3200000),
        Venue::Binance.trade_url(key.symbol()),
        Utc::now(),
    );

    dispatcher.dispatch_to_enabled(&spike(Venue::Binance)).await;
    dispatcher.dispatch_to_enabled(&pump).await;
    assert_eq!(notifier.count(), 1);
    assert!(notifier.sent.lock()[0].1.contains("PUMP"));
}

#[tokio::test]
async fn test_alerts_switched_off() {
    let store = Arc::new(InMemoryStore::from_recipients(&[recipient(1), recipient(2)]));
    assert_ok!(store.set_alerts_enabled(1, false));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = AlertDispatcher::new(notifier.clone(), store.clone(), Duration::ZERO);

    dispatcher.dispatch_to_enabled(&spike(Venue::Binance)).await;
    assert_eq!(notifier.recipients(), vec![2]);
    assert_err!(store.set_alerts_enabled(99, true));
}

#[tokio::test]
async fn test_store_outage_sends_nothing() {
    let store = Arc::new(InMemoryStore::from_recipients(&recipients()));
    store.set_unavailable(true);
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = AlertDispatcher::new(notifier.clone(), store, Duration::ZERO);

    let report = dispatcher.dispatch_to_enabled(&spike(Venue::Binance)).await;
    assert_eq!(report, DispatchReport::default());
    assert_eq!(notifier.count(), 0);
}
