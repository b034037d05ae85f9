//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_cycles_total` (counter): processing cycles run
//! - `relay_cycles_skipped_total` (counter): cycles skipped with the breaker open
//! - `relay_attempts_total` (counter): conversation attempts by outcome
//! - `relay_dispatch_failures_total` (counter): collaborator failures by kind
//! - `relay_attempt_duration_seconds` (histogram): time spent per conversation
//! - `relay_circuit_open` (gauge): 1=open, 0=closed
//! - `relay_consecutive_errors` (gauge): current loop error streak
//! - `relay_loop_restarts_total` (counter): self-healing restarts
//! - `relay_inbound_messages_total` (counter): ingested messages
//! - `relay_enrichment_failures_total` (counter): descriptions replaced by the placeholder
//! - `relay_conversations` (gauge): conversations held in history

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cycle(skipped: bool) {
    counter!("relay_cycles_total").increment(1);
    if skipped {
        counter!("relay_cycles_skipped_total").increment(1);
    }
}

pub fn record_attempt(outcome: &'static str, start: Instant) {
    counter!("relay_attempts_total", "outcome" => outcome).increment(1);
    histogram!("relay_attempt_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch_failure(kind: &'static str) {
    counter!("relay_dispatch_failures_total", "kind" => kind).increment(1);
}

pub fn record_circuit_state(open: bool) {
    gauge!("relay_circuit_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_consecutive_errors(count: u32) {
    gauge!("relay_consecutive_errors").set(f64::from(count));
}

pub fn record_loop_restart() {
    counter!("relay_loop_restarts_total").increment(1);
}

pub fn record_inbound_message() {
    counter!("relay_inbound_messages_total").increment(1);
}

pub fn record_enrichment_failure() {
    counter!("relay_enrichment_failures_total").increment(1);
}

pub fn record_conversations(count: usize) {
    gauge!("relay_conversations").set(count as f64);
}
