//! Detection cycle

use super::types::{CycleReport, PollConfig};
use crate::alert::{Alert, AlertClass, AlertDispatcher};
use crate::dedup::DedupTracker;
use crate::error::SourceError;
use crate::feed::{fetch_movers, MarketDataSource, Ticker};
use crate::history::HistoryStore;
use crate::instrument::{InstrumentKey, Venue};
use crate::scoring::{ScoreResult, ScoringEngine};
use crate::store::{Store, StoredAlert};
use crate::subscription::{Activation, SubscriptionManager};
use crate::telemetry::{
    increment, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Periodic orchestrator: fetch, record, score, dedup, dispatch
pub struct PollLoop {
    config: PollConfig,
    sources: Vec<Arc<dyn MarketDataSource>>,
    history: Arc<HistoryStore>,
    scoring: ScoringEngine,
    dedup: Arc<DedupTracker>,
    store: Arc<dyn Store>,
    dispatcher: AlertDispatcher,
    sniper: Option<Arc<SubscriptionManager>>,
}

impl PollLoop {
    /// Create a new poll loop
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PollConfig,
        sources: Vec<Arc<dyn MarketDataSource>>,
        history: Arc<HistoryStore>,
        scoring: ScoringEngine,
        dedup: Arc<DedupTracker>,
        store: Arc<dyn Store>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            config,
            sources,
            history,
            scoring,
            dedup,
            store,
            dispatcher,
            sniper: None,
        }
    }

    /// Hand high-scoring instruments to live order book streams
    pub fn with_sniper(mut self, sniper: Arc<SubscriptionManager>) -> Self {
        self.sniper = Some(sniper);
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn dedup(&self) -> &Arc<DedupTracker> {
        &self.dedup
    }

    /// Run cycles until `cancel` fires.
    ///
    /// Outstanding fetches are dropped on cancellation; a venue batch
    /// already being processed finishes first.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            sources = self.sources.len(),
            interval = ?self.config.interval,
            sniper = self.sniper.is_some(),
            "Poll loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.run_cycle_until(Utc::now(), &cancel).await;
            if report.cancelled {
                break;
            }

            let wait = if report.all_sources_failed() {
                let backoff = self.config.error_backoff;
                tracing::warn!(?backoff, "Every source failed, backing off");
                backoff
            } else {
                self.config.interval
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::info!("Poll loop stopped");
    }

    /// One detection cycle at `now`
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        self.run_cycle_until(now, &CancellationToken::new()).await
    }

    /// Each venue's tickers are processed as soon as its fetch completes,
    /// so a slow venue never holds back the others.
    async fn run_cycle_until(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();
        let mut pending: HashSet<Venue> = self.sources.iter().map(|s| s.venue()).collect();

        // Dropping the set on cancellation aborts the fetches still running
        let mut fetches = self.spawn_fetches();
        loop {
            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    return report;
                }
                joined = fetches.join_next() => joined,
            };

            match joined {
                Some(Ok((venue, result))) => {
                    pending.remove(&venue);
                    self.process_batch(venue, result, now, &mut report).await;
                }
                Some(Err(e)) => tracing::error!(error = %e, "Fetch task failed"),
                None => break,
            }
        }

        // Tasks that panicked never reported their venue
        for venue in pending {
            let reason = format!("{} fetch task did not finish", venue);
            let result = Err(SourceError::Aborted(reason));
            self.process_batch(venue, result, now, &mut report).await;
        }

        let history = self.history.cleanup(now);
        let expired = self.dedup.cleanup(now);

        set_gauge(GaugeMetric::TrackedInstruments, self.history.len() as f64);
        set_gauge(GaugeMetric::CooldownEntries, self.dedup.len() as f64);
        record_latency(LatencyMetric::PollCycle, start.elapsed());

        tracing::info!(
            sources_ok = report.sources_ok,
            sources_failed = report.sources_failed,
            tickers = report.tickers,
            alerts = report.alerts,
            activations = report.activations,
            dropped_samples = history.samples_removed,
            expired_cooldowns = expired,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        report
    }

    /// One fetch task per source; each fetch is bounded by the retry policy
    fn spawn_fetches(&self) -> JoinSet<(Venue, Result<Vec<Ticker>, SourceError>)> {
        let mut set = JoinSet::new();

        for source in &self.sources {
            let source = Arc::clone(source);
            let limit = self.config.movers_limit;
            let policy = self.config.retry;

            set.spawn(async move {
                let start = Instant::now();
                let result = fetch_movers(source.as_ref(), limit, &policy).await;
                record_latency(LatencyMetric::SourceFetch, start.elapsed());
                (source.venue(), result)
            });
        }

        set
    }

    async fn process_batch(
        &self,
        venue: Venue,
        result: Result<Vec<Ticker>, SourceError>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        match result {
            Ok(tickers) => {
                report.sources_ok += 1;
                tracing::debug!(%venue, tickers = tickers.len(), "Fetched movers");
                for ticker in &tickers {
                    self.process_ticker(ticker, now, report).await;
                }
            }
            Err(e) => {
                report.sources_failed += 1;
                increment(CounterMetric::SourceFailures, venue, None);
                tracing::warn!(%venue, error = %e, "Skipping source for this cycle");
            }
        }
    }

    async fn process_ticker(&self, ticker: &Ticker, now: DateTime<Utc>, report: &mut CycleReport) {
        let key = ticker.key();
        report.tickers += 1;

        self.history
            .record(&key, ticker.price, ticker.volume_24h, now);
        let Some(snapshot) = self.history.snapshot(&key) else {
            return;
        };

        let score = self.scoring.score(
            &key,
            ticker.price,
            ticker.volume_24h,
            ticker.change_24h,
            now,
            &snapshot,
        );

        if self.scoring.is_alertable(&score) {
            tracing::debug!(
                %key,
                score = score.score,
                confidence = ?score.confidence,
                "Early pump candidate"
            );
            self.early_pump(ticker, &key, &score, now, report).await;
        }

        let store = self.store.as_ref();
        for (class, change_pct) in self.threshold_classes(ticker, &key, now) {
            if self.dedup.should_alert(&key, class, now, store).await {
                let alert = Alert::new(
                    key.clone(),
                    class,
                    ticker.price,
                    change_pct,
                    ticker.change_24h,
                    ticker.volume_24h,
                    ticker.trade_url.clone(),
                    now,
                );
                self.deliver(alert, now, report).await;
            }
        }

        if score.score >= self.config.activation_score {
            self.activate(&key, report).await;
        }
    }

    async fn early_pump(
        &self,
        ticker: &Ticker,
        key: &InstrumentKey,
        score: &ScoreResult,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        let class = AlertClass::EarlyPump;
        let store = self.store.as_ref();
        if !self.dedup.should_alert(key, class, now, store).await {
            return;
        }

        let buy_pressure = self
            .sniper
            .as_ref()
            .and_then(|sniper| sniper.buy_pressure(key.venue(), key.symbol()));

        let alert = Alert::new(
            key.clone(),
            class,
            ticker.price,
            ticker.change_24h,
            ticker.change_24h,
            ticker.volume_24h,
            ticker.trade_url.clone(),
            now,
        )
        .with_score(score.clone())
        .with_buy_pressure(buy_pressure);

        self.deliver(alert, now, report).await;
    }

    /// Threshold classes that hold for this ticker, with the change that
    /// triggered each
    fn threshold_classes(
        &self,
        ticker: &Ticker,
        key: &InstrumentKey,
        now: DateTime<Utc>,
    ) -> Vec<(AlertClass, Decimal)> {
        let mut classes = Vec::new();
        let config = &self.config;

        let window_change = self
            .history
            .price_at(key, now - config.pump_window)
            .filter(|old| *old > Decimal::ZERO)
            .map(|old| (ticker.price - old) / old * Decimal::ONE_HUNDRED);

        if let Some(change) = window_change {
            if change >= config.pump_threshold_pct {
                classes.push((AlertClass::Pump5m, change));
            } else if change <= -config.dump_threshold_pct {
                classes.push((AlertClass::Dump5m, change));
            }
        }

        let daily = ticker.change_24h;
        if daily >= config.daily_spike_min_pct && daily <= config.daily_spike_max_pct {
            classes.push((AlertClass::DailySpike, daily));
        } else if daily <= -config.daily_spike_min_pct && daily >= -config.daily_spike_max_pct {
            classes.push((AlertClass::DailyDump, daily));
        }

        classes
    }

    /// Dispatch, then mark the cooldown and persist the alert
    async fn deliver(&self, alert: Alert, now: DateTime<Utc>, report: &mut CycleReport) {
        let dispatched = self.dispatcher.dispatch_to_enabled(&alert).await;

        self.dedup.mark_alerted(&alert.key, alert.class, now);
        let record = StoredAlert {
            key: alert.key.clone(),
            class: alert.class,
            change_pct: alert.change_pct,
            created_at: now,
        };
        if let Err(e) = self.store.save_alert(record).await {
            tracing::warn!(
                key = %alert.key,
                class = %alert.class,
                error = %e,
                "Failed to save alert"
            );
        }

        let class = Some(alert.class.as_str());
        increment(CounterMetric::AlertsDispatched, alert.key.venue(), class);
        report.alerts += 1;
        report.deliveries += dispatched.delivered;

        tracing::info!(
            key = %alert.key,
            class = %alert.class,
            change_pct = %alert.change_pct.round_dp(2),
            score = alert.score.as_ref().map(|s| s.score),
            delivered = dispatched.delivered,
            "Alert sent"
        );
    }

    async fn activate(&self, key: &InstrumentKey, report: &mut CycleReport) {
        let Some(sniper) = &self.sniper else {
            return;
        };
        if !sniper.supports(key.venue()) {
            return;
        }

        if let Activation::Added { evicted } = sniper.subscribe(key.venue(), key.symbol()).await {
            report.activations += 1;
            tracing::info!(%key, evicted = ?evicted, "Live order book activated");
        }
    }
}
