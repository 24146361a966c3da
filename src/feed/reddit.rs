// src/feed/reddit.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::MonitorConfig;
use crate::feed::parse_listing;
use crate::feed::types::FeedSource;
use crate::submission::SubmissionRecord;

pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

/// `/api/info` accepts at most this many fullnames per call.
const INFO_BATCH: usize = 100;
/// Refresh the bearer token this long before Reddit says it expires.
const TOKEN_SLACK_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Reddit OAuth client for one subreddit's `new` listing.
pub struct RedditFeed {
    client: reqwest::Client,
    app_id: String,
    app_secret: String,
    refresh_token: String,
    subreddit: String,
    limit: u32,
    auth_url: String,
    api_base: String,
    token: Mutex<Option<AccessToken>>,
}

impl RedditFeed {
    pub fn from_config(cfg: &MonitorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(20))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            client,
            app_id: cfg.app_id.clone(),
            app_secret: cfg.app_secret.clone(),
            refresh_token: cfg.refresh_token.clone(),
            subreddit: cfg.subreddit.clone(),
            limit: cfg.listing_limit,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point the client at other endpoints (local stand-in servers in tests).
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let base: String = api_base.into();
        self.auth_url = auth_url.into();
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if Utc::now() < tok.expires_at {
                return Ok(tok.value.clone());
            }
        }

        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.app_id, Some(&self.app_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .context("reddit token request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("reddit token request failed with status {status}");
        }
        let body: TokenResponse = resp.json().await.context("parse reddit token response")?;

        let ttl = (body.expires_in - TOKEN_SLACK_SECS).max(0);
        let tok = AccessToken {
            value: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl),
        };
        tracing::debug!(target: "feed", expires_at = %tok.expires_at, "reddit token refreshed");
        let value = tok.value.clone();
        *guard = Some(tok);
        Ok(value)
    }

    async fn get_listing(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<SubmissionRecord>> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .context("reddit http get()")?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; fetch a new one next time.
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            bail!("reddit GET {url} returned {status}");
        }
        let body = resp.text().await.context("reddit http .text()")?;
        parse_listing(&body)
    }
}

#[async_trait]
impl FeedSource for RedditFeed {
    async fn fetch_new(&self) -> Result<Vec<SubmissionRecord>> {
        let url = format!("{}/r/{}/new", self.api_base, self.subreddit);
        self.get_listing(&url, &[("limit", self.limit.to_string())])
            .await
    }

    /// A failed batch is skipped; the call only fails when every batch did.
    async fn fetch_scores(&self, ids: &[String]) -> Result<Vec<(String, i64)>> {
        let url = format!("{}/api/info", self.api_base);
        let mut out = Vec::with_capacity(ids.len());
        let mut last_err = None;
        let mut ok_batches = 0usize;
        for chunk in ids.chunks(INFO_BATCH) {
            let fullnames = chunk
                .iter()
                .map(|id| format!("t3_{id}"))
                .collect::<Vec<_>>()
                .join(",");
            match self.get_listing(&url, &[("id", fullnames)]).await {
                Ok(posts) => {
                    ok_batches += 1;
                    out.extend(posts.into_iter().map(|p| (p.id, p.score)));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "feed",
                        batch = chunk.len(),
                        "score batch failed: {e:#}"
                    );
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if ok_batches == 0 => Err(e),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
