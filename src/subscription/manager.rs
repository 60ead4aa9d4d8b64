//! Subscription manager

use super::types::{Activation, ConnectionState, Subscription, SubscriptionConfig};
use crate::instrument::Venue;
use crate::orderbook::OrderBookCache;
use crate::telemetry::{increment, set_active_subscriptions, CounterMetric};
use crate::venue::{Keepalive, StreamVenue};
use crate::ws::{WsClient, WsConfig, WsMessage};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Per-venue connection and subscription state
struct VenueSlot {
    adapter: Arc<dyn StreamVenue>,
    state: RwLock<ConnectionState>,
    /// Desired subscriptions in insertion order, oldest first
    active: Mutex<VecDeque<Subscription>>,
    /// Serialises subscribe requests and remembers when the last one went out
    gate: tokio::sync::Mutex<Option<Instant>>,
    outbound: RwLock<Option<mpsc::Sender<String>>>,
}

impl VenueSlot {
    fn new(adapter: Arc<dyn StreamVenue>) -> Self {
        Self {
            adapter,
            state: RwLock::new(ConnectionState::Disconnected),
            active: Mutex::new(VecDeque::new()),
            gate: tokio::sync::Mutex::new(None),
            outbound: RwLock::new(None),
        }
    }

    fn venue(&self) -> Venue {
        self.adapter.venue()
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        if *current != state {
            tracing::debug!(
                venue = %self.adapter.venue(),
                from = %*current,
                to = %state,
                "Stream state"
            );
            *current = state;
        }
    }

    fn is_active(&self, symbol: &str) -> bool {
        self.active.lock().iter().any(|s| s.symbol == symbol)
    }

    fn symbols(&self) -> Vec<String> {
        self.active
            .lock()
            .iter()
            .map(|s| s.symbol.clone())
            .collect()
    }

    /// Record activity on a subscribed symbol; false when it is not subscribed
    fn touch(&self, symbol: &str, at: DateTime<Utc>) -> bool {
        let mut active = self.active.lock();
        match active.iter_mut().find(|s| s.symbol == symbol) {
            Some(subscription) => {
                subscription.last_activity = Some(at);
                true
            }
            None => false,
        }
    }

    /// Sender for the open connection, if there is one
    fn open_sender(&self) -> Option<mpsc::Sender<String>> {
        if !self.state().is_open() {
            return None;
        }
        self.outbound.read().clone()
    }

    /// Best-effort send; dropped when the connection is not open
    async fn send(&self, text: String) -> bool {
        match self.open_sender() {
            Some(tx) => tx.send(text).await.is_ok(),
            None => false,
        }
    }
}

/// Wait until `gap` has passed since the previous request, then stamp a new one
async fn pace(last_request: &mut Option<Instant>, gap: Duration) {
    if let Some(last) = *last_request {
        let elapsed = last.elapsed();
        if elapsed < gap {
            tokio::time::sleep(gap - elapsed).await;
        }
    }
    *last_request = Some(Instant::now());
}

/// Bounded live order book subscriptions across venues
pub struct SubscriptionManager {
    config: SubscriptionConfig,
    slots: HashMap<Venue, Arc<VenueSlot>>,
    cache: Arc<OrderBookCache>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriptionManager {
    /// Create a manager for the given venue adapters; nothing connects until `start`
    pub fn new(config: SubscriptionConfig, venues: Vec<Arc<dyn StreamVenue>>) -> Self {
        let slots = venues
            .into_iter()
            .map(|adapter| {
                let slot = Arc::new(VenueSlot::new(adapter));
                (slot.venue(), slot)
            })
            .collect();

        Self {
            config,
            slots,
            cache: Arc::new(OrderBookCache::new()),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<OrderBookCache> {
        &self.cache
    }

    pub fn supports(&self, venue: Venue) -> bool {
        self.slots.contains_key(&venue)
    }

    /// Subscribe to a symbol's order book.
    ///
    /// At capacity the oldest subscription is evicted first. Consecutive
    /// requests on one venue are spaced by `subscribe_gap`. When the venue
    /// is not connected the symbol is only recorded and gets subscribed on
    /// the next successful connect.
    pub async fn subscribe(&self, venue: Venue, symbol: &str) -> Activation {
        let Some(slot) = self.slots.get(&venue) else {
            return Activation::Unsupported;
        };
        let symbol = symbol.to_lowercase();

        let mut last_request = slot.gate.lock().await;

        if slot.is_active(&symbol) {
            return Activation::AlreadyActive;
        }

        let evicted = {
            let mut active = slot.active.lock();
            if active.len() >= self.config.max_subscriptions {
                active.pop_front().map(|s| s.symbol)
            } else {
                None
            }
        };

        if let Some(old) = &evicted {
            self.cache.remove(venue, old);
            slot.send(slot.adapter.unsubscribe_message(old)).await;
            tracing::info!(%venue, symbol = %old, "Evicted oldest order book subscription");
        }

        pace(&mut last_request, self.config.subscribe_gap).await;

        let count = {
            let mut active = slot.active.lock();
            active.push_back(Subscription::new(symbol.clone(), Utc::now()));
            active.len()
        };

        let sent = slot.send(slot.adapter.subscribe_message(&symbol)).await;
        set_active_subscriptions(venue, count);
        tracing::info!(%venue, %symbol, sent, active = count, "Order book subscription added");

        Activation::Added { evicted }
    }

    /// Drop a subscription and its cached book; returns whether it existed
    pub async fn unsubscribe(&self, venue: Venue, symbol: &str) -> bool {
        let Some(slot) = self.slots.get(&venue) else {
            return false;
        };
        let symbol = symbol.to_lowercase();

        let (removed, count) = {
            let mut active = slot.active.lock();
            let before = active.len();
            active.retain(|s| s.symbol != symbol);
            (active.len() != before, active.len())
        };
        self.cache.remove(venue, &symbol);

        if removed {
            slot.send(slot.adapter.unsubscribe_message(&symbol)).await;
            set_active_subscriptions(venue, count);
            tracing::info!(%venue, %symbol, "Order book subscription removed");
        }
        removed
    }

    /// Bid share of the top levels, 0-100; 50 when no book is cached
    pub fn imbalance(&self, venue: Venue, symbol: &str) -> Decimal {
        let depth = self.config.imbalance_depth;
        self.cache.imbalance(venue, symbol, depth)
    }

    /// Imbalance only when a book is actually cached
    pub fn buy_pressure(&self, venue: Venue, symbol: &str) -> Option<Decimal> {
        self.cache
            .get(venue, symbol)
            .map(|book| book.imbalance(self.config.imbalance_depth))
    }

    /// Subscribed symbols for a venue, oldest first
    pub fn active_symbols(&self, venue: Venue) -> Vec<String> {
        self.slots
            .get(&venue)
            .map(|slot| slot.symbols())
            .unwrap_or_default()
    }

    /// Subscriptions for a venue with their activity, oldest first
    pub fn subscriptions(&self, venue: Venue) -> Vec<Subscription> {
        self.slots
            .get(&venue)
            .map(|slot| slot.active.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, venue: Venue, symbol: &str) -> bool {
        self.slots
            .get(&venue)
            .is_some_and(|slot| slot.is_active(&symbol.to_lowercase()))
    }

    pub fn state(&self, venue: Venue) -> Option<ConnectionState> {
        self.slots.get(&venue).map(|slot| slot.state())
    }

    /// Spawn one connection task per venue plus a keepalive task where the
    /// venue needs one. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() || self.cancel.is_cancelled() {
            return;
        }

        for slot in self.slots.values() {
            let ws_config = WsConfig::new(slot.adapter.ws_url())
                .reconnect_delay(self.config.reconnect_delay)
                .read_timeout(self.config.read_timeout);
            let ws_config = match slot.adapter.keepalive() {
                Some(keepalive) => ws_config.idle_ping(keepalive.message),
                None => ws_config,
            };

            let client = WsClient::new(ws_config);
            let (rx, tx) = client.connect_bidirectional(self.cancel.child_token());
            *slot.outbound.write() = Some(tx);
            slot.set_state(ConnectionState::Connecting);

            tasks.push(tokio::spawn(run_stream(
                slot.clone(),
                self.cache.clone(),
                rx,
                self.config.subscribe_gap,
                self.cancel.clone(),
            )));

            if let Some(keepalive) = slot.adapter.keepalive() {
                let task = run_keepalive(slot.clone(), keepalive, self.cancel.clone());
                tasks.push(tokio::spawn(task));
            }

            tracing::info!(
                venue = %slot.venue(),
                url = %slot.adapter.ws_url(),
                "Order book stream started"
            );
        }
    }

    /// Close every stream and wait for the tasks to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Stream task ended abnormally");
            }
        }
        for slot in self.slots.values() {
            *slot.outbound.write() = None;
            slot.set_state(ConnectionState::Disconnected);
        }
        tracing::info!("Order book streams stopped");
    }
}

/// Consume one venue's socket events until shutdown
async fn run_stream(
    slot: Arc<VenueSlot>,
    cache: Arc<OrderBookCache>,
    mut rx: mpsc::Receiver<WsMessage>,
    subscribe_gap: Duration,
    cancel: CancellationToken,
) {
    let venue = slot.venue();

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => None,
            msg = rx.recv() => msg,
        };

        match msg {
            Some(WsMessage::Connected) => {
                slot.set_state(ConnectionState::Connected);
                let resubscribed = resubscribe(&slot, subscribe_gap).await;
                tracing::info!(%venue, resubscribed, "Order book stream connected");
            }
            Some(WsMessage::Text(text)) => {
                if slot.state() == ConnectionState::Connected {
                    slot.set_state(ConnectionState::Receiving);
                }
                let Some(update) = slot.adapter.parse_message(&text) else {
                    continue;
                };
                if slot.touch(&update.symbol, Utc::now()) {
                    cache.insert(venue, &update.symbol, update.snapshot);
                }
            }
            Some(WsMessage::Reconnecting { attempt }) => {
                slot.set_state(ConnectionState::Reconnecting);
                increment(CounterMetric::StreamReconnects, venue, None);
                tracing::warn!(%venue, attempt, "Order book stream reconnecting");
            }
            Some(WsMessage::Binary(_)) => {}
            Some(WsMessage::Disconnected) | None => {
                slot.set_state(ConnectionState::Disconnected);
                break;
            }
        }
    }

    // Wait for the socket task to close the connection
    if cancel.is_cancelled() {
        while let Some(msg) = rx.recv().await {
            if matches!(msg, WsMessage::Disconnected) {
                break;
            }
        }
    }
    slot.set_state(ConnectionState::Disconnected);
}

/// Resend every desired subscription after a connect, through the same
/// gate and spacing as `subscribe`
async fn resubscribe(slot: &VenueSlot, gap: Duration) -> usize {
    let mut last_request = slot.gate.lock().await;
    let desired = slot.symbols();
    for symbol in &desired {
        pace(&mut last_request, gap).await;
        slot.send(slot.adapter.subscribe_message(symbol)).await;
    }
    desired.len()
}

/// Send the venue's keepalive on every tick while the connection is open
async fn run_keepalive(slot: Arc<VenueSlot>, keepalive: Keepalive, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(keepalive.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(tx) = slot.open_sender() else {
                    continue;
                };
                if tx.try_send(keepalive.message.clone()).is_err() {
                    tracing::debug!(
                        venue = %slot.venue(),
                        "Keepalive dropped, outbound queue full"
                    );
                }
            }
        }
    }
}
