//! console.rs — line-based report prompt on stdin.

use std::future::Future;
use std::io::BufRead;

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::bridge::AggregatorStats;
use crate::report::ReportGenerator;
use crate::session::MonitorSession;

pub const PROMPT: &str = "Press Enter (or `s`) to display statistics, `q` to quit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report,
    Quit,
    Unknown,
}

pub fn parse_command(line: &str) -> Command {
    // A bare space counts as the "spacebar" key.
    if line.trim().is_empty() {
        return Command::Report;
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "stats" | "report" => Command::Report,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown,
    }
}

/// Read `input` line by line on a detached OS thread.
///
/// The thread is not owned by the runtime, so a read still blocked on a
/// terminal does not keep the process alive after `main` returns. The
/// channel closes on EOF or on a read error.
pub fn spawn_line_reader<R>(input: R) -> Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("console input failed: {e}");
                        break;
                    }
                }
            }
        })
        .context("spawn console input thread")?;
    Ok(rx)
}

/// Read commands until `q` or EOF, writing reports to `out`.
pub async fn run_console<W>(
    mut lines: mpsc::Receiver<String>,
    mut out: W,
    reports: &ReportGenerator,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("{PROMPT}\n").as_bytes())
        .await
        .context("write prompt")?;
    out.flush().await.context("flush console")?;

    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            Command::Report => {
                let text = reports.report().render_text();
                out.write_all(text.as_bytes()).await.context("write report")?;
            }
            Command::Quit => break,
            Command::Unknown => {
                let hint = format!("Unknown command `{}`. {PROMPT}\n", line.trim());
                out.write_all(hint.as_bytes()).await.context("write hint")?;
            }
        }
        out.flush().await.context("flush console")?;
    }
    Ok(())
}

/// Run the console until it ends or `stop` resolves, then shut `session`
/// down. A console error is returned only after the session has drained.
pub async fn run_session<W, F>(
    session: MonitorSession,
    lines: mpsc::Receiver<String>,
    out: W,
    stop: F,
) -> Result<AggregatorStats>
where
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let reports = session.reports();
    let console = tokio::select! {
        res = run_console(lines, out, &reports) => res,
        _ = stop => Ok(()),
    };

    let stats = session.shutdown().await?;
    tracing::info!(
        target: "store",
        ingested = stats.ingested,
        score_updates = stats.score_updates,
        "session finished"
    );
    console.map(|_| stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fixture::FixtureFeed;
    use crate::feed::monitor::MonitorSettings;
    use crate::store::SubmissionStore;
    use crate::submission::SubmissionRecord;
    use std::sync::Arc;

    #[test]
    fn commands_parse() {
        assert_eq!(parse_command(""), Command::Report);
        assert_eq!(parse_command(" "), Command::Report);
        assert_eq!(parse_command("S"), Command::Report);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("help"), Command::Unknown);
    }

    #[tokio::test]
    async fn report_then_quit_stops_reading() {
        let store = Arc::new(SubmissionStore::new());
        store.ingest(SubmissionRecord::new("p1", "Hello", "alice", 2));
        let reports = ReportGenerator::new(store);

        let input = spawn_line_reader(&b"\nq\n\n"[..]).unwrap();
        let mut out = Vec::new();
        run_console(input, &mut out, &reports).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("User: alice, Num. Posts: 1"));
        assert_eq!(text.matches("Posts by Upvotes:").count(), 1);
    }

    #[tokio::test]
    async fn empty_store_prints_no_data_lines() {
        let reports = ReportGenerator::new(Arc::new(SubmissionStore::new()));
        let input = spawn_line_reader(&b"s\nwhat\n"[..]).unwrap();
        let mut out = Vec::new();
        run_console(input, &mut out, &reports).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No users data to report."));
        assert!(text.contains("No posts data to report."));
        assert!(text.contains("Unknown command `what`."));
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn fixture_session(feed: Arc<FixtureFeed>) -> MonitorSession {
        let settings = MonitorSettings {
            interval: std::time::Duration::from_millis(5),
            score_threshold: 1,
            include_existing: true,
            max_tracked: 10,
        };
        MonitorSession::start(feed, settings, 16)
    }

    #[tokio::test]
    async fn console_write_error_still_shuts_the_session_down() {
        let feed = Arc::new(FixtureFeed::from_records(vec![SubmissionRecord::new(
            "p1", "Hello", "alice", 2,
        )]));
        let session = fixture_session(feed.clone());
        let input = spawn_line_reader(&b"s\n"[..]).unwrap();

        let err = run_session(session, input, BrokenPipe, std::future::pending())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("write prompt"));
        // The monitor task has ended and released its handle on the feed.
        assert_eq!(Arc::strong_count(&feed), 1);
    }

    #[tokio::test]
    async fn stop_signal_ends_the_session_and_drains() {
        let feed = Arc::new(FixtureFeed::from_records(vec![SubmissionRecord::new(
            "p1", "Hello", "alice", 2,
        )]));
        let session = fixture_session(feed.clone());
        let store = session.store();
        let (_keep_open, lines) = mpsc::channel::<String>(1);

        let stop = async {
            for _ in 0..200 {
                if !store.is_empty() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        };
        let stats = run_session(session, lines, tokio::io::sink(), stop)
            .await
            .unwrap();
        assert_eq!(stats.ingested, 1);
        assert_eq!(store.len(), 1);
    }

    /// A reader that never returns, like a terminal nobody types into.
    struct Stalled;

    impl std::io::Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(std::time::Duration::from_secs(60));
            Ok(0)
        }
    }

    #[test]
    fn stalled_input_does_not_hold_up_runtime_shutdown() {
        let started = std::time::Instant::now();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let reports = ReportGenerator::new(Arc::new(SubmissionStore::new()));
            let input = spawn_line_reader(std::io::BufReader::new(Stalled)).unwrap();
            tokio::select! {
                _ = run_console(input, tokio::io::sink(), &reports) => panic!("console ended"),
                _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
            }
        });
        drop(rt);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
