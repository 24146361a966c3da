// src/feed/types.rs
use anyhow::Result;

use crate::submission::SubmissionRecord;

/// Something that can list a subreddit's newest posts and re-read scores.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Newest posts first, as the listing returns them.
    async fn fetch_new(&self) -> Result<Vec<SubmissionRecord>>;
    /// Current `(id, score)` for the given ids. Ids the source no longer
    /// knows about are simply absent from the result.
    async fn fetch_scores(&self, ids: &[String]) -> Result<Vec<(String, i64)>>;
    fn name(&self) -> &'static str;
}
