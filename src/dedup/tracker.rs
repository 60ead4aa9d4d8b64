//! Cooldown tracker

use crate::alert::AlertClass;
use crate::config::DedupConfig;
use crate::instrument::InstrumentKey;
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Last-sent markers per (instrument, class)
pub struct DedupTracker {
    early_pump_cooldown: Duration,
    threshold_cooldown: Duration,
    last_alerted: RwLock<HashMap<(InstrumentKey, AlertClass), DateTime<Utc>>>,
}

impl DedupTracker {
    /// Create a new tracker
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            early_pump_cooldown: Duration::seconds(config.early_pump_cooldown_secs as i64),
            threshold_cooldown: Duration::seconds(config.threshold_cooldown_secs as i64),
            last_alerted: RwLock::new(HashMap::new()),
        }
    }

    /// Create a tracker with 30/60 minute cooldowns
    pub fn with_defaults() -> Self {
        Self::new(&DedupConfig::default())
    }

    /// Cooldown for a class
    pub fn cooldown(&self, class: AlertClass) -> Duration {
        if class.is_threshold() {
            self.threshold_cooldown
        } else {
            self.early_pump_cooldown
        }
    }

    /// Local-only check
    pub fn is_cooling_down(
        &self,
        key: &InstrumentKey,
        class: AlertClass,
        now: DateTime<Utc>,
    ) -> bool {
        self.last_alerted
            .read()
            .get(&(key.clone(), class))
            .is_some_and(|last| now - *last < self.cooldown(class))
    }

    /// Whether an alert of `class` may be sent for `key`.
    ///
    /// The local map answers first. On a local miss the store's recent alert
    /// history decides; a hit there is copied into the local map. A store
    /// error suppresses the alert.
    pub async fn should_alert(
        &self,
        key: &InstrumentKey,
        class: AlertClass,
        now: DateTime<Utc>,
        store: &dyn Store,
    ) -> bool {
        if self.is_cooling_down(key, class, now) {
            return false;
        }

        let cooldown = self.cooldown(class);
        match store.recent_alerts(key, cooldown, now).await {
            Ok(recent) => {
                let latest = recent
                    .iter()
                    .filter(|a| a.class == class)
                    .map(|a| a.created_at)
                    .max();
                match latest {
                    Some(at) => {
                        tracing::debug!(%key, %class, %at, "Alert suppressed by store history");
                        self.remember(key, class, at);
                        false
                    }
                    None => true,
                }
            }
            Err(e) => {
                tracing::warn!(
                    %key,
                    %class,
                    error = %e,
                    "Store dedup check failed, suppressing alert"
                );
                false
            }
        }
    }

    /// Record that an alert was sent
    pub fn mark_alerted(&self, key: &InstrumentKey, class: AlertClass, now: DateTime<Utc>) {
        self.last_alerted.write().insert((key.clone(), class), now);
    }

    /// Forget entries older than twice the longest cooldown; returns the number removed
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let horizon = self.early_pump_cooldown.max(self.threshold_cooldown) * 2;
        let mut map = self.last_alerted.write();
        let before = map.len();
        map.retain(|_, at| now - *at <= horizon);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.last_alerted.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alerted.read().is_empty()
    }

    fn remember(&self, key: &InstrumentKey, class: AlertClass, at: DateTime<Utc>) {
        let mut map = self.last_alerted.write();
        let entry = map.entry((key.clone(), class)).or_insert(at);
        if *entry < at {
            *entry = at;
        }
    }
}

impl Default for DedupTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
