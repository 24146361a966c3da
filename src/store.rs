//! # Submission Store
//! In-memory index of every submission seen during one monitoring session.
//!
//! Holds the arrival-ordered submission list, an id → position index and
//! the author → titles projection. All three live behind a single mutex so
//! a snapshot never observes a record that is in one collection but not
//! yet in the other.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::{counter, gauge};

use crate::submission::SubmissionRecord;
use crate::telemetry::ensure_metrics_described;

/// Result of [`SubmissionStore::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    /// A record with the same id was already tracked; nothing was changed.
    Duplicate,
}

/// Titles posted by one author, in ingestion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorEntry {
    pub author: String,
    pub titles: Vec<String>,
}

/// Owned, read-consistent copy of the store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Submissions in arrival order.
    pub submissions: Vec<SubmissionRecord>,
    /// Authors in first-seen order.
    pub authors: Vec<AuthorEntry>,
}

impl StoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Titles for `author`, if the author has posted anything.
    pub fn titles_of(&self, author: &str) -> Option<&[String]> {
        self.authors
            .iter()
            .find(|a| a.author == author)
            .map(|a| a.titles.as_slice())
    }
}

#[derive(Debug, Default)]
struct Inner {
    submissions: Vec<SubmissionRecord>,
    by_id: HashMap<String, usize>,
    authors: Vec<AuthorEntry>,
    author_pos: HashMap<String, usize>,
}

/// Thread-safe aggregation store for one monitoring session.
#[derive(Debug, Default)]
pub struct SubmissionStore {
    inner: Mutex<Inner>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self::default()
    }

    // Mutations below only run after every check, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new submission and index its title under its author.
    ///
    /// Ids already present are rejected and leave the store untouched.
    pub fn ingest(&self, record: SubmissionRecord) -> IngestOutcome {
        let mut inner = self.lock();
        if inner.by_id.contains_key(&record.id) {
            counter!("monitor_duplicate_submissions_total").increment(1);
            return IngestOutcome::Duplicate;
        }

        let pos = inner.submissions.len();
        inner.by_id.insert(record.id.clone(), pos);

        let existing = inner.author_pos.get(&record.author).copied();
        match existing {
            Some(i) => inner.authors[i].titles.push(record.title.clone()),
            None => {
                let i = inner.authors.len();
                inner.author_pos.insert(record.author.clone(), i);
                inner.authors.push(AuthorEntry {
                    author: record.author.clone(),
                    titles: vec![record.title.clone()],
                });
            }
        }
        inner.submissions.push(record);

        counter!("monitor_submissions_ingested_total").increment(1);
        gauge!("monitor_tracked_submissions").set(inner.submissions.len() as f64);
        IngestOutcome::Inserted
    }

    /// Set the score of the submission with `id`. Returns `false` when the
    /// id is not tracked; the store is left unchanged in that case.
    pub fn update_score(&self, id: &str, new_score: i64) -> bool {
        let mut inner = self.lock();
        let Some(&pos) = inner.by_id.get(id) else {
            return false;
        };
        inner.submissions[pos].score = new_score;
        true
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            submissions: inner.submissions.clone(),
            authors: inner.authors.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Option<SubmissionRecord> {
        let inner = self.lock();
        inner
            .by_id
            .get(id)
            .map(|&pos| inner.submissions[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.lock().submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
