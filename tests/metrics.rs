// tests/metrics.rs
//
// One test per binary: the Prometheus recorder is process-global.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use subreddit_monitor::api::{self, AppState};
use subreddit_monitor::bridge::{apply_event, AggregatorStats};
use subreddit_monitor::telemetry::Metrics;
use subreddit_monitor::{FeedEvent, ReportGenerator, SubmissionRecord, SubmissionStore};

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::init().expect("install recorder");

    let store = Arc::new(SubmissionStore::new());
    let mut stats = AggregatorStats::default();
    apply_event(
        &store,
        FeedEvent::NewSubmissions(vec![SubmissionRecord::new("p1", "Hello", "alice", 1)]),
        &mut stats,
    );
    apply_event(
        &store,
        FeedEvent::ScoreChanged {
            id: "p1".into(),
            new_score: 4,
        },
        &mut stats,
    );
    apply_event(
        &store,
        FeedEvent::ScoreChanged {
            id: "nope".into(),
            new_score: 4,
        },
        &mut stats,
    );

    let app = api::router(
        AppState {
            reports: ReportGenerator::new(store),
        },
        Some(&metrics),
    );
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "monitor_submissions_ingested_total",
        "monitor_score_updates_total",
        "monitor_unknown_score_updates_total",
        "monitor_tracked_submissions",
    ] {
        assert!(text.contains(needle), "missing series {needle} in:\n{text}");
    }
}
