use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the pipeline metrics.
    /// Fails if a recorder is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("symbols_analyzed_total", "Symbols analyzed successfully");
    describe_counter!(
        "symbol_failures_total",
        "Symbols that failed analysis (invalid, unavailable or timed out)"
    );
    describe_counter!(
        "source_fetch_errors_total",
        "Collaborator fetch failures absorbed as degraded sources, by source"
    );
    describe_counter!(
        "items_skipped_total",
        "Malformed items skipped during aggregation, by source"
    );
    describe_histogram!(
        "symbol_analysis_ms",
        Unit::Milliseconds,
        "Wall time of one symbol analysis"
    );
}
