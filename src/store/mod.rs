//! Store module
//!
//! Alert history and recipient preferences. The detector only talks to the
//! `Store` trait; the bundled implementation keeps everything in memory.

mod memory;

pub use memory::InMemoryStore;

use crate::alert::AlertClass;
use crate::error::StoreError;
use crate::instrument::{InstrumentKey, Venue};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A persisted record of one dispatched alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub key: InstrumentKey,
    pub class: AlertClass,
    pub change_pct: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A recipient with alerts switched on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    /// Venues the recipient wants alerts from; `None` means all
    pub alert_venues: Option<Vec<Venue>>,
}

impl Recipient {
    pub fn wants_venue(&self, venue: Venue) -> bool {
        self.alert_venues
            .as_ref()
            .is_none_or(|venues| venues.contains(&venue))
    }
}

/// Trait for alert history and recipient storage
#[async_trait]
pub trait Store: Send + Sync {
    /// Alerts for `key` created within `within` of `now`, any class
    async fn recent_alerts(
        &self,
        key: &InstrumentKey,
        within: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredAlert>, StoreError>;

    /// Persist a dispatched alert
    async fn save_alert(&self, alert: StoredAlert) -> Result<(), StoreError>;

    /// Recipients that have alerts enabled
    async fn recipients_with_alerts_enabled(&self) -> Result<Vec<Recipient>, StoreError>;

    async fn is_banned(&self, recipient_id: i64) -> Result<bool, StoreError>;

    /// Per-class switches; classes missing from the map are enabled
    async fn alert_type_preferences(
        &self,
        recipient_id: i64,
    ) -> Result<HashMap<AlertClass, bool>, StoreError>;
}
