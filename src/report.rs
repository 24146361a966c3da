//! # Report
//! Ranked views over a [`StoreSnapshot`]: authors by number of posts and
//! submissions by score.
//!
//! Both rankings use a stable sort, so equal counts keep the author's
//! first-seen order and equal scores keep arrival order. Calling either
//! twice on the same snapshot yields identical output.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;

use crate::store::{StoreSnapshot, SubmissionStore};
use crate::submission::SubmissionRecord;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthorRank {
    pub author: String,
    pub count: usize,
}

/// Authors ordered by how many titles they have in the snapshot, most first.
pub fn rank_authors_by_post_count(snapshot: &StoreSnapshot) -> Vec<AuthorRank> {
    let mut out: Vec<AuthorRank> = snapshot
        .authors
        .iter()
        .map(|a| AuthorRank {
            author: a.author.clone(),
            count: a.titles.len(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Submissions ordered by score, highest first.
pub fn rank_submissions_by_score(snapshot: &StoreSnapshot) -> Vec<SubmissionRecord> {
    let mut out = snapshot.submissions.clone();
    out.sort_by(|a, b| b.score.cmp(&a.score));
    out
}

/// Both rankings taken from one snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub authors: Vec<AuthorRank>,
    pub submissions: Vec<SubmissionRecord>,
}

impl Report {
    pub fn build(snapshot: &StoreSnapshot) -> Self {
        Self {
            authors: rank_authors_by_post_count(snapshot),
            submissions: rank_submissions_by_score(snapshot),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.submissions.is_empty()
    }

    /// Console rendering; empty sections print a "no data" line instead of a header.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        if self.authors.is_empty() {
            out.push_str("No users data to report.\n");
        } else {
            out.push_str("Users by Number of Posts:\n");
            for a in &self.authors {
                let _ = writeln!(out, "User: {}, Num. Posts: {}", a.author, a.count);
            }
        }

        if self.submissions.is_empty() {
            out.push_str("No posts data to report.\n");
        } else {
            out.push_str("Posts by Upvotes:\n");
            for s in &self.submissions {
                let _ = writeln!(out, "Post: {}, UpVotes: {}", s.title, s.score);
            }
        }

        out
    }
}

/// Pull-based reporting handle over the session store. Cheap to clone;
/// every call takes a fresh snapshot, so it is safe to use while ingestion
/// is running.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    store: Arc<SubmissionStore>,
}

impl ReportGenerator {
    pub fn new(store: Arc<SubmissionStore>) -> Self {
        Self { store }
    }

    pub fn author_ranking(&self) -> Vec<AuthorRank> {
        rank_authors_by_post_count(&self.store.snapshot())
    }

    pub fn submission_ranking(&self) -> Vec<SubmissionRecord> {
        rank_submissions_by_score(&self.store.snapshot())
    }

    /// Both rankings from the same snapshot.
    pub fn report(&self) -> Report {
        Report::build(&self.store.snapshot())
    }
}
