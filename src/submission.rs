//! submission.rs — a single tracked post.

use serde::{Deserialize, Serialize};

/// One submission observed on the feed.
///
/// `id`, `title` and `author` are fixed when the record is created; only
/// `score` changes afterwards (through [`crate::store::SubmissionStore::update_score`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
}

impl SubmissionRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        score: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            score,
        }
    }
}
