//! # Event Bridge
//! Turns feed notifications into store mutations.
//!
//! Producers (the feed monitor, tests, any other source) push [`FeedEvent`]s
//! through an [`EventBridge`]; one aggregation task owns the receiving end
//! and applies events to the [`SubmissionStore`] in arrival order. Dropping
//! every bridge closes the channel; the task then drains what is already
//! queued and exits, so no event that was accepted is lost halfway.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{IngestOutcome, SubmissionStore};
use crate::submission::SubmissionRecord;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    NewSubmissions(Vec<SubmissionRecord>),
    ScoreChanged { id: String, new_score: i64 },
}

/// Sending half handed to the feed layer.
#[derive(Debug, Clone)]
pub struct EventBridge {
    tx: mpsc::Sender<FeedEvent>,
}

impl EventBridge {
    /// Create a bridge plus the receiver to hand to [`spawn_aggregator`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub async fn on_new_submissions(&self, batch: Vec<SubmissionRecord>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.send(FeedEvent::NewSubmissions(batch)).await
    }

    pub async fn on_score_changed(&self, id: impl Into<String>, new_score: i64) -> Result<()> {
        self.send(FeedEvent::ScoreChanged {
            id: id.into(),
            new_score,
        })
        .await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, ev: FeedEvent) -> Result<()> {
        self.tx
            .send(ev)
            .await
            .map_err(|_| anyhow!("aggregator stopped; event dropped"))
    }
}

/// Counts of what the aggregation task applied, returned when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub ingested: u64,
    pub duplicates: u64,
    pub score_updates: u64,
    pub unknown_ids: u64,
}

/// Apply one event to the store. Never fails: duplicates and unknown ids
/// are counted and logged, nothing else.
pub fn apply_event(store: &SubmissionStore, ev: FeedEvent, stats: &mut AggregatorStats) {
    match ev {
        FeedEvent::NewSubmissions(batch) => {
            for record in batch {
                tracing::debug!(
                    target: "store",
                    id = %record.id,
                    author = %record.author,
                    title = %record.title,
                    "new post"
                );
                let id = record.id.clone();
                match store.ingest(record) {
                    IngestOutcome::Inserted => stats.ingested += 1,
                    IngestOutcome::Duplicate => {
                        stats.duplicates += 1;
                        tracing::warn!(target: "store", id = %id, "duplicate submission ignored");
                    }
                }
            }
        }
        FeedEvent::ScoreChanged { id, new_score } => {
            if store.update_score(&id, new_score) {
                stats.score_updates += 1;
                counter!("monitor_score_updates_total").increment(1);
                tracing::debug!(target: "store", id = %id, score = new_score, "score updated");
            } else {
                stats.unknown_ids += 1;
                counter!("monitor_unknown_score_updates_total").increment(1);
                tracing::debug!(target: "store", id = %id, "score change for untracked id");
            }
        }
    }
}

/// Spawn the single consumer that owns all store writes.
pub fn spawn_aggregator(
    store: Arc<SubmissionStore>,
    mut rx: mpsc::Receiver<FeedEvent>,
) -> JoinHandle<AggregatorStats> {
    tokio::spawn(async move {
        let mut stats = AggregatorStats::default();
        while let Some(ev) = rx.recv().await {
            apply_event(&store, ev, &mut stats);
        }
        tracing::info!(
            target: "store",
            ingested = stats.ingested,
            duplicates = stats.duplicates,
            score_updates = stats.score_updates,
            unknown_ids = stats.unknown_ids,
            "aggregator drained"
        );
        stats
    })
}
