// src/feed/fixture.rs
//! In-memory feed for tests and offline runs. The listing can be changed
//! between polls to simulate new posts and score movement.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::feed::parse_listing;
use crate::feed::types::FeedSource;
use crate::submission::SubmissionRecord;

#[derive(Debug, Default)]
struct State {
    /// Newest first, like the real listing.
    posts: Vec<SubmissionRecord>,
    failures_left: u32,
}

#[derive(Debug, Default)]
pub struct FixtureFeed {
    state: Mutex<State>,
}

impl FixtureFeed {
    /// Build from a Reddit listing JSON document.
    pub fn from_fixture(json: &str) -> Result<Self> {
        Ok(Self::from_records(parse_listing(json)?))
    }

    pub fn from_records(posts: Vec<SubmissionRecord>) -> Self {
        Self {
            state: Mutex::new(State {
                posts,
                failures_left: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a new post at the top of the listing.
    pub fn add_post(&self, post: SubmissionRecord) {
        self.lock().posts.insert(0, post);
    }

    pub fn set_score(&self, id: &str, score: i64) -> bool {
        let mut st = self.lock();
        match st.posts.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.score = score;
                true
            }
            None => false,
        }
    }

    /// Drop a post from the listing (removed or expired upstream).
    pub fn remove_post(&self, id: &str) {
        self.lock().posts.retain(|p| p.id != id);
    }

    /// Make the next `n` fetches fail.
    pub fn fail_next(&self, n: u32) {
        self.lock().failures_left = n;
    }

    fn take_failure(&self) -> bool {
        let mut st = self.lock();
        if st.failures_left > 0 {
            st.failures_left -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl FeedSource for FixtureFeed {
    async fn fetch_new(&self) -> Result<Vec<SubmissionRecord>> {
        if self.take_failure() {
            bail!("fixture feed: injected failure");
        }
        Ok(self.lock().posts.clone())
    }

    async fn fetch_scores(&self, ids: &[String]) -> Result<Vec<(String, i64)>> {
        if self.take_failure() {
            bail!("fixture feed: injected failure");
        }
        let st = self.lock();
        let out = ids
            .iter()
            .filter_map(|id| {
                st.posts
                    .iter()
                    .find(|p| &p.id == id)
                    .map(|p| (p.id.clone(), p.score))
            })
            .collect();
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
