//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_requests_total` (counter): requests by service, operation, status
//! - `ledger_request_duration_seconds` (histogram): latency distribution
//! - `ledger_downstream_calls_total` (counter): cross-service calls by endpoint, outcome
//! - `ledger_best_effort_failures_total` (counter): discarded write failures by statement
//! - `ledger_classic_traces_total` (counter): storage operations recorded in classic mode
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so tests need no setup
//! - Prometheus scrape endpoint only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &'static str, operation: &str, status: u16, start: Instant) {
    let labels = [
        ("service", service.to_string()),
        ("operation", operation.to_string()),
        ("status", status.to_string()),
    ];
    counter!("ledger_requests_total", &labels).increment(1);
    histogram!("ledger_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_downstream_call(endpoint: &'static str, outcome: &'static str) {
    counter!("ledger_downstream_calls_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
}

pub fn record_best_effort_failure(statement: &'static str) {
    counter!("ledger_best_effort_failures_total", "statement" => statement).increment(1);
}

pub fn record_classic_trace(statement: &'static str) {
    counter!("ledger_classic_traces_total", "statement" => statement).increment(1);
}

/// Router middleware recording one sample per request.
pub async fn track_requests(
    State(service): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let operation = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let response = next.run(request).await;
    record_request(service, &operation, response.status().as_u16(), start);
    response
}
