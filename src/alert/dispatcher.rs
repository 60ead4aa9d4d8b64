//! Alert fan-out to recipients

use super::{Alert, Notifier};
use crate::store::{Recipient, Store};
use crate::telemetry::{increment, CounterMetric};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Banned, class disabled, venue filtered, or preference lookup failed
    pub skipped: usize,
    pub failed: usize,
}

/// Filters recipients by preference and sends through a notifier
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn Store>,
    send_delay: Duration,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(notifier: Arc<dyn Notifier>, store: Arc<dyn Store>, send_delay: Duration) -> Self {
        Self {
            notifier,
            store,
            send_delay,
        }
    }

    /// Send `alert` to every recipient in `recipients` that wants it.
    ///
    /// Per-recipient failures are logged and counted; they never stop the
    /// remaining sends.
    pub async fn dispatch(&self, alert: &Alert, recipients: &[Recipient]) -> DispatchReport {
        let mut report = DispatchReport::default();
        let text = alert.render();
        let venue = alert.key.venue();
        let mut sent_any = false;

        for recipient in recipients {
            if !self.wants(alert, recipient).await {
                report.skipped += 1;
                continue;
            }

            if sent_any && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            sent_any = true;

            match self.notifier.send(recipient.id, &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    let channel = Some(self.notifier.name());
                    increment(CounterMetric::DeliveryFailures, venue, channel);
                    tracing::warn!(
                        recipient_id = recipient.id,
                        key = %alert.key,
                        class = %alert.class,
                        error = %e,
                        "Alert delivery failed"
                    );
                }
            }
        }

        tracing::debug!(
            key = %alert.key,
            class = %alert.class,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "Alert dispatched"
        );

        report
    }

    /// Send `alert` to every recipient the store lists as enabled
    pub async fn dispatch_to_enabled(&self, alert: &Alert) -> DispatchReport {
        match self.store.recipients_with_alerts_enabled().await {
            Ok(recipients) => self.dispatch(alert, &recipients).await,
            Err(e) => {
                tracing::error!(
                    key = %alert.key,
                    class = %alert.class,
                    error = %e,
                    "Failed to load recipients"
                );
                DispatchReport::default()
            }
        }
    }

    async fn wants(&self, alert: &Alert, recipient: &Recipient) -> bool {
        match self.store.is_banned(recipient.id).await {
            Ok(false) => {}
            Ok(true) => return false,
            Err(e) => {
                tracing::warn!(
                    recipient_id = recipient.id,
                    error = %e,
                    "Ban check failed, skipping"
                );
                return false;
            }
        }

        if !recipient.wants_venue(alert.key.venue()) {
            return false;
        }

        match self.store.alert_type_preferences(recipient.id).await {
            Ok(prefs) => prefs.get(&alert.class).copied().unwrap_or(true),
            Err(e) => {
                tracing::warn!(
                    recipient_id = recipient.id,
                    error = %e,
                    "Preference lookup failed, skipping"
                );
                false
            }
        }
    }
}
