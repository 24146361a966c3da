//! # Monitoring Session
//! Owns everything that lives for one run: the store, the aggregation
//! task and the feed monitor.
//!
//! Shutdown order matters: the monitor is told to stop first and awaited,
//! which drops the last [`EventBridge`]; the aggregator then drains the
//! events still queued and exits. Nothing that was already accepted is
//! abandoned mid-update.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bridge::{spawn_aggregator, AggregatorStats, EventBridge};
use crate::feed::monitor::{FeedMonitor, MonitorSettings};
use crate::feed::types::FeedSource;
use crate::report::ReportGenerator;
use crate::store::SubmissionStore;

pub struct MonitorSession {
    store: Arc<SubmissionStore>,
    shutdown_tx: watch::Sender<bool>,
    monitor: JoinHandle<()>,
    aggregator: JoinHandle<AggregatorStats>,
}

impl MonitorSession {
    /// Start polling `feed` and aggregating into a fresh store.
    pub fn start(
        feed: Arc<dyn FeedSource>,
        settings: MonitorSettings,
        channel_capacity: usize,
    ) -> Self {
        let store = Arc::new(SubmissionStore::new());
        let (bridge, rx) = EventBridge::channel(channel_capacity);
        let aggregator = spawn_aggregator(store.clone(), rx);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = FeedMonitor::new(feed, bridge, settings).spawn(shutdown_rx);

        tracing::info!(
            target: "store",
            interval_secs = settings.interval.as_secs(),
            score_threshold = settings.score_threshold,
            "monitoring session started"
        );

        Self {
            store,
            shutdown_tx,
            monitor,
            aggregator,
        }
    }

    pub fn store(&self) -> Arc<SubmissionStore> {
        self.store.clone()
    }

    pub fn reports(&self) -> ReportGenerator {
        ReportGenerator::new(self.store.clone())
    }

    /// Stop the monitor, then wait for the aggregator to drain.
    pub async fn shutdown(self) -> Result<AggregatorStats> {
        // Receiver may already be gone if the monitor exited on its own.
        let _ = self.shutdown_tx.send(true);
        self.monitor.await.context("feed monitor task")?;
        let stats = self.aggregator.await.context("aggregator task")?;
        Ok(stats)
    }
}
