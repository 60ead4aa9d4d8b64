//! In-memory store

use super::{Recipient, Store, StoredAlert};
use crate::alert::AlertClass;
use crate::config::RecipientConfig;
use crate::error::StoreError;
use crate::instrument::InstrumentKey;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Alerts older than this are dropped on the next save
const ALERT_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone)]
struct RecipientEntry {
    recipient: Recipient,
    alerts_enabled: bool,
    banned: bool,
    preferences: HashMap<AlertClass, bool>,
}

/// Store kept entirely in process memory; state is lost on restart
#[derive(Default)]
pub struct InMemoryStore {
    alerts: RwLock<Vec<StoredAlert>>,
    recipients: RwLock<HashMap<i64, RecipientEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with configured recipients
    pub fn from_recipients(configs: &[RecipientConfig]) -> Self {
        let store = Self::new();
        for config in configs {
            store.add_recipient(config);
        }
        store
    }

    /// Add or replace a recipient
    pub fn add_recipient(&self, config: &RecipientConfig) {
        let preferences = config
            .disabled_classes
            .iter()
            .map(|class| (*class, false))
            .collect();

        self.recipients.write().insert(
            config.id,
            RecipientEntry {
                recipient: Recipient {
                    id: config.id,
                    alert_venues: config.alert_venues.clone(),
                },
                alerts_enabled: true,
                banned: config.banned,
                preferences,
            },
        );
    }

    /// Switch alerts on or off for a recipient
    pub fn set_alerts_enabled(&self, recipient_id: i64, enabled: bool) -> Result<(), StoreError> {
        let mut recipients = self.recipients.write();
        let entry = recipients
            .get_mut(&recipient_id)
            .ok_or(StoreError::UnknownRecipient(recipient_id))?;
        entry.alerts_enabled = enabled;
        Ok(())
    }

    /// Simulate an outage: every call fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All retained alerts, oldest first
    pub fn alerts(&self) -> Vec<StoredAlert> {
        self.alerts.read().clone()
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.read().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn recent_alerts(
        &self,
        key: &InstrumentKey,
        within: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredAlert>, StoreError> {
        self.check_available()?;
        let cutoff = now - within;
        let alerts = self.alerts.read();
        Ok(alerts
            .iter()
            .filter(|a| &a.key == key && a.created_at > cutoff)
            .cloned()
            .collect())
    }

    async fn save_alert(&self, alert: StoredAlert) -> Result<(), StoreError> {
        self.check_available()?;
        let cutoff = alert.created_at - Duration::hours(ALERT_RETENTION_HOURS);
        let mut alerts = self.alerts.write();
        alerts.retain(|a| a.created_at > cutoff);
        alerts.push(alert);
        Ok(())
    }

    async fn recipients_with_alerts_enabled(&self) -> Result<Vec<Recipient>, StoreError> {
        self.check_available()?;
        let recipients = self.recipients.read();
        let mut enabled: Vec<Recipient> = recipients
            .values()
            .filter(|entry| entry.alerts_enabled)
            .map(|entry| entry.recipient.clone())
            .collect();
        enabled.sort_by_key(|r| r.id);
        Ok(enabled)
    }

    async fn is_banned(&self, recipient_id: i64) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self
            .recipients
            .read()
            .get(&recipient_id)
            .is_some_and(|entry| entry.banned))
    }

    async fn alert_type_preferences(
        &self,
        recipient_id: i64,
    ) -> Result<HashMap<AlertClass, bool>, StoreError> {
        self.check_available()?;
        self.recipients
            .read()
            .get(&recipient_id)
            .map(|entry| entry.preferences.clone())
            .ok_or(StoreError::UnknownRecipient(recipient_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Venue;
    use rust_decimal_macros::dec;

    fn recipient(id: i64) -> RecipientConfig {
        RecipientConfig {
            id,
            alert_venues: None,
            disabled_classes: vec![],
            banned: false,
        }
    }

    fn stored(key: &InstrumentKey, class: AlertClass, at: DateTime<Utc>) -> StoredAlert {
        StoredAlert {
            key: key.clone(),
            class,
            change_pct: dec!(12.5),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_recent_alerts_filters_by_key_and_window() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let btc = InstrumentKey::new("BTCUSDT", Venue::Binance);
        let btc_mexc = InstrumentKey::new("BTCUSDT", Venue::Mexc);

        store
            .save_alert(stored(&btc, AlertClass::Pump5m, now - Duration::minutes(90)))
            .await
            .unwrap();
        store
            .save_alert(stored(&btc, AlertClass::DailySpike, now - Duration::minutes(20)))
            .await
            .unwrap();
        store
            .save_alert(stored(&btc_mexc, AlertClass::DailySpike, now))
            .await
            .unwrap();

        let recent = store
            .recent_alerts(&btc, Duration::hours(1), now)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].class, AlertClass::DailySpike);
    }

    #[tokio::test]
    async fn test_save_prunes_day_old_alerts() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let key = InstrumentKey::new("ETHUSDT", Venue::Binance);

        store
            .save_alert(stored(&key, AlertClass::Dump5m, now - Duration::hours(30)))
            .await
            .unwrap();
        store
            .save_alert(stored(&key, AlertClass::Dump5m, now))
            .await
            .unwrap();

        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_recipients_seeded_from_config() {
        let mut banned = recipient(3);
        banned.banned = true;
        let mut picky = recipient(2);
        picky.disabled_classes = vec![AlertClass::EarlyPump];
        picky.alert_venues = Some(vec![Venue::Mexc]);

        let store = InMemoryStore::from_recipients(&[recipient(1), picky, banned]);
        assert_eq!(store.recipient_count(), 3);

        let enabled = store.recipients_with_alerts_enabled().await.unwrap();
        let ids: Vec<_> = enabled.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!enabled[1].wants_venue(Venue::Binance));
        assert!(enabled[0].wants_venue(Venue::Binance));

        assert!(store.is_banned(3).await.unwrap());
        assert!(!store.is_banned(1).await.unwrap());
        assert!(!store.is_banned(99).await.unwrap());

        let prefs = store.alert_type_preferences(2).await.unwrap();
        assert_eq!(prefs.get(&AlertClass::EarlyPump), Some(&false));
        assert!(store.alert_type_preferences(99).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_recipient_not_listed() {
        let store = InMemoryStore::from_recipients(&[recipient(1), recipient(2)]);
        store.set_alerts_enabled(1, false).unwrap();
        assert!(store.set_alerts_enabled(7, false).is_err());

        let enabled = store.recipients_with_alerts_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = InMemoryStore::from_recipients(&[recipient(1)]);
        store.set_unavailable(true);

        let key = InstrumentKey::new("BTCUSDT", Venue::Binance);
        let recent = store.recent_alerts(&key, Duration::hours(1), Utc::now());
        assert!(recent.await.is_err());
        assert!(store.recipients_with_alerts_enabled().await.is_err());

        store.set_unavailable(false);
        assert!(store.recipients_with_alerts_enabled().await.is_ok());
    }
}
