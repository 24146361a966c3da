use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "monitor_submissions_ingested_total",
            "Submissions added to the store."
        );
        describe_counter!(
            "monitor_duplicate_submissions_total",
            "Submissions rejected because their id was already tracked."
        );
        describe_counter!(
            "monitor_score_updates_total",
            "Score changes applied to tracked submissions."
        );
        describe_counter!(
            "monitor_unknown_score_updates_total",
            "Score changes for ids the store does not track."
        );
        describe_counter!("monitor_feed_errors_total", "Feed fetch/parse errors.");
        describe_gauge!(
            "monitor_tracked_submissions",
            "Number of submissions currently tracked."
        );
        describe_histogram!("monitor_feed_poll_ms", "Feed poll time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
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
