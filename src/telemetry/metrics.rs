//! Prometheus metrics

use crate::instrument::Venue;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One full detection cycle
    PollCycle,
    /// One venue's top-movers fetch, retries included
    SourceFetch,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Instruments with live history windows
    TrackedInstruments,
    /// Local cooldown entries
    CooldownEntries,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Alerts that passed dedup and were handed to the dispatcher
    AlertsDispatched,
    /// Per-recipient delivery failures
    DeliveryFailures,
    /// Venue batches dropped for a cycle
    SourceFailures,
    /// Stream reconnect attempts
    StreamReconnects,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::PollCycle => "pumpwatch_poll_cycle_ms",
        LatencyMetric::SourceFetch => "pumpwatch_source_fetch_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::TrackedInstruments => "pumpwatch_tracked_instruments",
        GaugeMetric::CooldownEntries => "pumpwatch_cooldown_entries",
    };

    ::metrics::gauge!(metric_name).set(value);
}

/// Set the live subscription count for a venue
pub fn set_active_subscriptions(venue: Venue, count: usize) {
    ::metrics::gauge!("pumpwatch_active_subscriptions", "venue" => venue.as_str())
        .set(count as f64);
}

/// Increment a counter, labelled by venue and an optional detail
pub fn increment(metric: CounterMetric, venue: Venue, detail: Option<&'static str>) {
    let metric_name = match metric {
        CounterMetric::AlertsDispatched => "pumpwatch_alerts_dispatched_total",
        CounterMetric::DeliveryFailures => "pumpwatch_delivery_failures_total",
        CounterMetric::SourceFailures => "pumpwatch_source_failures_total",
        CounterMetric::StreamReconnects => "pumpwatch_stream_reconnects_total",
    };

    match detail {
        Some(detail) => {
            ::metrics::counter!(metric_name, "venue" => venue.as_str(), "detail" => detail)
                .increment(1)
        }
        None => ::metrics::counter!(metric_name, "venue" => venue.as_str()).increment(1),
    }
}
