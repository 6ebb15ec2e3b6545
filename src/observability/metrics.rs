//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tts_synthesis_attempts_total` (counter): failed attempts by voice, error kind
//! - `tts_synthesis_outcomes_total` (counter): requests by final outcome
//! - `tts_synthesis_duration_seconds` (histogram): successful request latency
//! - `tts_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until `init_metrics` installs the exporter, so
//! tests never need a recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one failed synthesis attempt.
pub fn record_failed_attempt(voice: &str, kind: &'static str) {
    counter!("tts_synthesis_attempts_total", "voice" => voice.to_string(), "error" => kind).increment(1);
}

/// Record the final outcome of a synthesis request.
pub fn record_outcome(outcome: &'static str) {
    counter!("tts_synthesis_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record latency of a successful synthesis request.
pub fn record_synthesis_duration(voice: &str, started: Instant) {
    histogram!("tts_synthesis_duration_seconds", "voice" => voice.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Publish the breaker state.
pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    gauge!("tts_circuit_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}
