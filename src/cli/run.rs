//! Run command implementation

use crate::alert::{build_notifier, AlertDispatcher};
use crate::config::Config;
use crate::dedup::DedupTracker;
use crate::feed::build_sources;
use crate::history::{HistoryStore, WindowConfig};
use crate::poller::{PollConfig, PollLoop};
use crate::scoring::ScoringEngine;
use crate::store::{InMemoryStore, Store};
use crate::subscription::{SubscriptionConfig, SubscriptionManager};
use crate::venue::build_stream_venues;
use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run a single detection cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let store = Arc::new(InMemoryStore::from_recipients(&config.recipients));
        if store.recipient_count() == 0 {
            tracing::warn!("No recipients configured, alerts will only be logged");
        }

        let notifier = build_notifier(&config.notifier)?;
        let dispatcher = AlertDispatcher::new(
            notifier.clone(),
            store.clone() as Arc<dyn Store>,
            Duration::from_millis(config.notifier.send_delay_ms),
        );

        let poller = PollLoop::new(
            PollConfig::from(&config),
            build_sources(&config.sources)?,
            Arc::new(HistoryStore::new(WindowConfig::from(&config.history))),
            ScoringEngine::new(config.scoring.clone()),
            Arc::new(DedupTracker::new(&config.dedup)),
            store,
            dispatcher,
        );

        tracing::info!(
            venues = ?config.sources.venues,
            notifier = notifier.name(),
            sniper = config.sniper.enabled,
            "Starting pumpwatch"
        );

        if self.once {
            let report = poller.run_cycle(Utc::now()).await;
            println!(
                "Cycle: {} sources ok, {} failed, {} tickers, {} alerts, {} deliveries",
                report.sources_ok,
                report.sources_failed,
                report.tickers,
                report.alerts,
                report.deliveries
            );
            return Ok(());
        }

        let sniper = if config.sniper.enabled {
            let venues = build_stream_venues(&config.sniper)?;
            let manager = Arc::new(SubscriptionManager::new(
                SubscriptionConfig::from(&config.sniper),
                venues,
            ));
            manager.start();
            Some(manager)
        } else {
            None
        };

        let poller = match &sniper {
            Some(manager) => poller.with_sniper(manager.clone()),
            None => poller,
        };

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        });

        poller.run(cancel).await;

        if let Some(manager) = sniper {
            manager.shutdown().await;
        }

        tracing::info!("pumpwatch stopped");
        Ok(())
    }
}
