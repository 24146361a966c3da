// src/feed/mod.rs
pub mod fixture;
pub mod monitor;
pub mod reddit;
pub mod types;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::submission::SubmissionRecord;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
}

/// Normalize a post title: decode HTML entities, collapse whitespace, trim.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a Reddit listing (`/r/{sub}/new`, `/api/info`) into records,
/// keeping the listing order. Entries without an id are skipped.
pub fn parse_listing(body: &str) -> Result<Vec<SubmissionRecord>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    let out = listing
        .data
        .children
        .into_iter()
        .filter(|t| !t.data.id.trim().is_empty())
        .map(|t| SubmissionRecord {
            id: t.data.id.trim().to_string(),
            title: normalize_title(&t.data.title),
            author: t.data.author.trim().to_string(),
            score: t.data.score,
        })
        .collect();
    Ok(out)
}
