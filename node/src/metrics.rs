//! # Prometheus Metrics
//!
//! Exposes operational metrics for the peer. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers. Labels carry
//! function names and error kinds only.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Invocations received, by function name.
    pub invocations_total: IntCounterVec,
    /// Invocations that returned an error, by error kind.
    pub failed_invocations_total: IntCounterVec,
    /// Transactions committed to the ledger by this peer.
    pub committed_transactions_total: IntCounter,
    /// Commits rejected because a key read during execution changed.
    pub mvcc_conflicts_total: IntCounter,
    /// Current ledger height.
    pub ledger_height: IntGauge,
    /// Invocation latency in seconds, from request to result.
    pub invocation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("cloister".into()), None)?;

        let invocations_total = IntCounterVec::new(
            Opts::new("invocations_total", "Total number of contract invocations"),
            &["function"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let failed_invocations_total = IntCounterVec::new(
            Opts::new(
                "failed_invocations_total",
                "Total number of contract invocations that returned an error",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(failed_invocations_total.clone()))?;

        let committed_transactions_total = IntCounter::new(
            "committed_transactions_total",
            "Total number of transactions committed by this peer",
        )?;
        registry.register(Box::new(committed_transactions_total.clone()))?;

        let mvcc_conflicts_total = IntCounter::new(
            "mvcc_conflicts_total",
            "Total number of commits rejected by read-set validation",
        )?;
        registry.register(Box::new(mvcc_conflicts_total.clone()))?;

        let ledger_height = IntGauge::new("ledger_height", "Height of the latest commit")?;
        registry.register(Box::new(ledger_height.clone()))?;

        let invocation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "invocation_latency_seconds",
                "Contract invocation latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
        )?;
        registry.register(Box::new(invocation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            invocations_total,
            failed_invocations_total,
            committed_transactions_total,
            mvcc_conflicts_total,
            ledger_height,
            invocation_latency_seconds,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
