// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::DEFAULT_CHANNEL_CAPACITY;

const ENV_PATH: &str = "MONITOR_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/monitor.toml";

fn default_poll_interval_secs() -> u64 {
    15
}
fn default_score_threshold() -> i64 {
    1
}
fn default_listing_limit() -> u32 {
    100
}
fn default_max_tracked() -> usize {
    500
}
fn default_user_agent() -> String {
    concat!("subreddit-monitor/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Subreddit name without the `r/` prefix.
    #[serde(default)]
    pub subreddit: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum absolute score delta that produces a score-change event.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: i64,
    /// Posts requested per listing call (Reddit caps this at 100).
    #[serde(default = "default_listing_limit")]
    pub listing_limit: u32,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Newest posts whose scores keep being refreshed; older ones are dropped.
    #[serde(default = "default_max_tracked")]
    pub max_tracked: usize,
    /// Emit posts already in the listing at startup instead of only newer ones.
    #[serde(default)]
    pub include_existing: bool,
    /// Bind address for the HTTP report surface; disabled when unset.
    #[serde(default)]
    pub http_addr: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            refresh_token: String::new(),
            subreddit: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            score_threshold: default_score_threshold(),
            listing_limit: default_listing_limit(),
            channel_capacity: default_channel_capacity(),
            max_tracked: default_max_tracked(),
            include_existing: false,
            http_addr: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Command-line options. Every option can also come from the environment
/// (or a `.env` file loaded before parsing).
#[derive(Parser, Debug, Default)]
#[command(name = "subreddit-monitor")]
#[command(about = "Watch a subreddit for new posts and report top authors and posts")]
pub struct CliArgs {
    /// Reddit refresh token.
    #[arg(short = 'r', long, env = "REDDIT_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Subreddit to monitor (with or without the `r/` prefix).
    #[arg(short, long, env = "MONITOR_SUBREDDIT")]
    pub subreddit: Option<String>,

    /// Reddit application id.
    #[arg(long, env = "REDDIT_APP_ID")]
    pub app_id: Option<String>,

    /// Reddit application secret.
    #[arg(long, env = "REDDIT_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Seconds between feed polls.
    #[arg(long, env = "MONITOR_POLL_SECS")]
    pub poll_secs: Option<u64>,

    /// Minimum score delta reported as a change.
    #[arg(long, env = "MONITOR_SCORE_THRESHOLD")]
    pub score_threshold: Option<i64>,

    /// How many of the newest posts keep getting score refreshes.
    #[arg(long, env = "MONITOR_MAX_TRACKED")]
    pub max_tracked: Option<usize>,

    /// Serve the report over HTTP on this address (e.g. 127.0.0.1:8080).
    #[arg(long, env = "MONITOR_HTTP_ADDR")]
    pub http_addr: Option<String>,

    #[arg(long, env = "MONITOR_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Also report posts that were already listed when monitoring started.
    #[arg(long, env = "MONITOR_INCLUDE_EXISTING")]
    pub include_existing: bool,

    /// TOML config file (defaults to config/monitor.toml when present).
    #[arg(long, env = "MONITOR_CONFIG_PATH")]
    pub config: Option<PathBuf>,
}

impl MonitorConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing monitor config {}", path.display()))
    }

    /// Load using fallbacks:
    /// 1) `explicit` path (from `--config`)
    /// 2) $MONITOR_CONFIG_PATH
    /// 3) config/monitor.toml
    /// 4) built-in defaults
    pub fn load_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Command-line/env values win over file values.
    pub fn merge_cli(&mut self, cli: &CliArgs) {
        if let Some(v) = &cli.refresh_token {
            self.refresh_token = v.clone();
        }
        if let Some(v) = &cli.subreddit {
            self.subreddit = v.clone();
        }
        if let Some(v) = &cli.app_id {
            self.app_id = v.clone();
        }
        if let Some(v) = &cli.app_secret {
            self.app_secret = v.clone();
        }
        if let Some(v) = cli.poll_secs {
            self.poll_interval_secs = v;
        }
        if let Some(v) = cli.score_threshold {
            self.score_threshold = v;
        }
        if let Some(v) = cli.max_tracked {
            self.max_tracked = v;
        }
        if let Some(v) = &cli.http_addr {
            self.http_addr = Some(v.clone());
        }
        if let Some(v) = &cli.user_agent {
            self.user_agent = v.clone();
        }
        if cli.include_existing {
            self.include_existing = true;
        }
    }

    /// Trim inputs, clamp numeric knobs and check required fields.
    pub fn validated(mut self) -> Result<Self> {
        self.app_id = self.app_id.trim().to_string();
        self.app_secret = self.app_secret.trim().to_string();
        self.refresh_token = self.refresh_token.trim().to_string();
        self.subreddit = normalize_subreddit(&self.subreddit);
        self.http_addr = self
            .http_addr
            .take()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        for (name, value) in [
            ("app_id", &self.app_id),
            ("app_secret", &self.app_secret),
            ("refresh_token", &self.refresh_token),
            ("subreddit", &self.subreddit),
        ] {
            if value.is_empty() {
                bail!("missing required setting `{name}`");
            }
        }

        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.score_threshold = self.score_threshold.max(1);
        self.listing_limit = self.listing_limit.clamp(1, 100);
        self.channel_capacity = self.channel_capacity.max(1);
        self.max_tracked = self.max_tracked.max(1);
        Ok(self)
    }

    /// File → CLI/env → validation.
    pub fn resolve(cli: &CliArgs) -> Result<Self> {
        let mut cfg = Self::load_default(cli.config.as_deref())?;
        cfg.merge_cli(cli);
        cfg.validated()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// `r/rust`, `/r/rust/` and ` rust ` all become `rust`.
pub fn normalize_subreddit(s: &str) -> String {
    let t = s.trim().trim_matches('/');
    let t = t
        .strip_prefix("r/")
        .or_else(|| t.strip_prefix("R/"))
        .unwrap_or(t);
    t.trim_matches('/').to_string()
}
