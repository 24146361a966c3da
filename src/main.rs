//! subreddit-monitor — binary entrypoint.
//! Loads config, starts the monitoring session, optionally serves the
//! report over HTTP, and runs the console prompt until `q` or Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subreddit_monitor::api::{self, AppState};
use subreddit_monitor::config::{CliArgs, MonitorConfig};
use subreddit_monitor::console::{run_session, spawn_line_reader};
use subreddit_monitor::feed::monitor::MonitorSettings;
use subreddit_monitor::feed::reddit::RedditFeed;
use subreddit_monitor::telemetry::Metrics;
use subreddit_monitor::MonitorSession;

/// Logs go to stderr so the console report on stdout stays readable.
/// `RUST_LOG` overrides the default filter; `MONITOR_LOG_JSON=1` switches
/// to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("subreddit_monitor=info,feed=info,store=info,api=info,warn")
    });
    let json = std::env::var("MONITOR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn spawn_http(
    addr: &str,
    state: AppState,
    metrics: Option<&Metrics>,
) -> Result<JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding http surface on {addr}"))?;
    tracing::info!(target: "api", addr, "http report surface listening");

    let app = api::router(state, metrics);
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!(target: "api", "http server stopped: {e:#}");
        }
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; missing file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = CliArgs::parse();
    let cfg = MonitorConfig::resolve(&cli)?;

    // Recorder first so descriptors registered by the store are kept.
    let metrics = match cfg.http_addr {
        Some(_) => Some(Metrics::init()?),
        None => None,
    };

    let feed = Arc::new(RedditFeed::from_config(&cfg)?);
    let session = MonitorSession::start(feed, MonitorSettings::from(&cfg), cfg.channel_capacity);
    tracing::info!(target: "feed", subreddit = %cfg.subreddit, "monitoring started");

    let server = match cfg.http_addr.as_deref() {
        Some(addr) => {
            let state = AppState {
                reports: session.reports(),
            };
            Some(spawn_http(addr, state, metrics.as_ref()).await?)
        }
        None => None,
    };

    let lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; stopping");
        } else {
            std::future::pending::<()>().await;
        }
    };
    let finished = run_session(session, lines, tokio::io::stdout(), ctrl_c).await;
    if let Some(h) = server {
        h.abort();
    }
    finished?;

    println!("Done!");
    Ok(())
}
