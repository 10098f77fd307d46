//! Metrics collection and exposition.
//!
//! # Metrics
//! - `confirmation_items_total` (counter): processed users by outcome
//! - `confirmation_abandoned_total` (counter): abandoned users by stage
//! - `confirmation_queue_depth` (gauge): users waiting for the worker
//! - `confirmation_enqueue_rejected_total` (counter): signups refused by a closed queue
//! - `shutdown_drain_seconds` (histogram): time spent draining the queue at shutdown
//! - `shutdown_drain_timeouts_total` (counter): drains cut short by the deadline
//! - `http_requests_total` (counter): requests by route, status
//!
//! Without an installed recorder every helper is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::confirmation::worker::Outcome;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_confirmation_outcome(outcome: &Outcome) {
    ::metrics::counter!("confirmation_items_total", "outcome" => outcome.label()).increment(1);
    if let Outcome::Abandoned { stage, .. } = outcome {
        ::metrics::counter!("confirmation_abandoned_total", "stage" => stage.as_str())
            .increment(1);
    }
}

pub fn record_queue_depth(depth: usize) {
    ::metrics::gauge!("confirmation_queue_depth").set(depth as f64);
}

pub fn record_enqueue_rejected() {
    ::metrics::counter!("confirmation_enqueue_rejected_total").increment(1);
}

pub fn record_shutdown_drain(elapsed: Duration, timed_out: bool) {
    ::metrics::histogram!("shutdown_drain_seconds").record(elapsed.as_secs_f64());
    if timed_out {
        ::metrics::counter!("shutdown_drain_timeouts_total").increment(1);
    }
}

pub fn record_request(route: &'static str, status: u16) {
    ::metrics::counter!(
        "http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}
