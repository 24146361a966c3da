// src/feed/monitor.rs
//! Polling loop that turns listing diffs into [`FeedEvent`]s.
//!
//! [`FeedEvent`]: crate::bridge::FeedEvent

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::{counter, histogram};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bridge::EventBridge;
use crate::config::MonitorConfig;
use crate::feed::types::FeedSource;

/// Upper bound on the error backoff, as a multiple of the poll interval.
const MAX_BACKOFF_FACTOR: u32 = 8;

#[derive(Clone, Copy, Debug)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub score_threshold: i64,
    pub include_existing: bool,
    /// Most recent posts whose scores are still followed.
    pub max_tracked: usize,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            interval: cfg.poll_interval(),
            score_threshold: cfg.score_threshold,
            include_existing: cfg.include_existing,
            max_tracked: cfg.max_tracked,
        }
    }
}

/// What one poll produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Posts marked as already seen on the first poll (not emitted).
    pub primed: usize,
    pub new_posts: usize,
    pub score_changes: usize,
}

pub struct FeedMonitor {
    feed: Arc<dyn FeedSource>,
    bridge: EventBridge,
    settings: MonitorSettings,
    primed: bool,
    seen: HashSet<String>,
    /// Ids whose scores are followed, oldest first. Capped at
    /// `settings.max_tracked`.
    tracked: VecDeque<String>,
    last_scores: HashMap<String, i64>,
}

impl FeedMonitor {
    pub fn new(feed: Arc<dyn FeedSource>, bridge: EventBridge, settings: MonitorSettings) -> Self {
        Self {
            feed,
            bridge,
            settings,
            primed: false,
            seen: HashSet::new(),
            tracked: VecDeque::new(),
            last_scores: HashMap::new(),
        }
    }

    /// Fetch the listing once, emit unseen posts oldest first, then emit
    /// score changes for the tracked window.
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        let t0 = Instant::now();
        let mut outcome = PollOutcome::default();

        let listing = self.feed.fetch_new().await?;

        if !self.primed && !self.settings.include_existing {
            for p in &listing {
                self.seen.insert(p.id.clone());
            }
            self.primed = true;
            outcome.primed = listing.len();
            tracing::info!(
                target: "feed",
                provider = self.feed.name(),
                primed = outcome.primed,
                "listing primed; reporting posts created from now on"
            );
            return Ok(outcome);
        }
        self.primed = true;

        let listed: HashSet<String> = listing.iter().map(|p| p.id.clone()).collect();
        let mut fresh = Vec::new();
        for p in listing.into_iter().rev() {
            if self.seen.insert(p.id.clone()) {
                self.tracked.push_back(p.id.clone());
                self.last_scores.insert(p.id.clone(), p.score);
                fresh.push(p);
            }
        }
        self.trim_window(&listed);
        outcome.new_posts = fresh.len();
        self.bridge.on_new_submissions(fresh).await?;

        if !self.tracked.is_empty() {
            let ids: Vec<String> = self.tracked.iter().cloned().collect();
            let scores = self.feed.fetch_scores(&ids).await?;
            for (id, score) in scores {
                let Some(last) = self.last_scores.get_mut(&id) else {
                    continue;
                };
                if score.abs_diff(*last) >= self.settings.score_threshold.max(0) as u64 {
                    *last = score;
                    self.bridge.on_score_changed(id, score).await?;
                    outcome.score_changes += 1;
                }
            }
        }

        histogram!("monitor_feed_poll_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(outcome)
    }

    /// Stop following the oldest posts once the window is full. `seen` keeps
    /// only what is still listed or still tracked, so it stays bounded too.
    fn trim_window(&mut self, listed: &HashSet<String>) {
        let cap = self.settings.max_tracked.max(1);
        while self.tracked.len() > cap {
            if let Some(old) = self.tracked.pop_front() {
                self.last_scores.remove(&old);
            }
        }
        let last_scores = &self.last_scores;
        self.seen
            .retain(|id| listed.contains(id) || last_scores.contains_key(id));
    }

    /// Delay before the next poll after `failures` consecutive errors.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures).min(MAX_BACKOFF_FACTOR);
        self.settings.interval.saturating_mul(factor)
    }

    /// Poll until `shutdown` flips to `true` or the aggregator goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut failures: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.poll_once().await {
                Ok(out) => {
                    failures = 0;
                    if out.new_posts > 0 || out.score_changes > 0 {
                        tracing::info!(
                            target: "feed",
                            new_posts = out.new_posts,
                            score_changes = out.score_changes,
                            "feed tick"
                        );
                    }
                }
                Err(e) => {
                    if self.bridge.is_closed() {
                        tracing::info!(target: "feed", "aggregator closed; monitor stopping");
                        break;
                    }
                    failures = failures.saturating_add(1);
                    counter!("monitor_feed_errors_total").increment(1);
                    tracing::warn!(
                        target: "feed",
                        provider = self.feed.name(),
                        failures,
                        "feed poll failed: {e:#}"
                    );
                }
            }

            let delay = self.backoff(failures);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(target: "feed", tracked = self.tracked.len(), "monitor stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
