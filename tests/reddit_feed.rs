// tests/reddit_feed.rs
//
// RedditFeed against a local stand-in for the OAuth and listing endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use subreddit_monitor::config::MonitorConfig;
use subreddit_monitor::feed::reddit::RedditFeed;
use subreddit_monitor::feed::types::FeedSource;

const FIXTURE: &str = include_str!("fixtures/reddit_new.json");

#[derive(Clone, Default)]
struct Fake {
    token_calls: Arc<AtomicUsize>,
}

async fn token(State(fake): State<Fake>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if !auth.starts_with("Basic ") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "no basic auth" })));
    }
    fake.token_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({ "access_token": "tok-1", "token_type": "bearer", "expires_in": 3600 })),
    )
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == "Bearer tok-1")
}

async fn new_listing(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    assert_eq!(q.get("limit").map(String::as_str), Some("100"));
    (StatusCode::OK, FIXTURE.to_string())
}

async fn info(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if q.get("id").is_some_and(|ids| ids.contains("t3_broken")) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
    }
    let children: Vec<Value> = q
        .get("id")
        .map(|ids| {
            ids.split(',')
                .filter_map(|full| full.strip_prefix("t3_"))
                .filter(|id| *id != "gone")
                .map(|id| {
                    json!({
                        "kind": "t3",
                        "data": { "id": id, "title": "x", "author": "y", "score": 100 }
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({ "kind": "Listing", "data": { "children": children } })),
    )
}

async fn start_fake() -> (String, Fake) {
    let fake = Fake::default();
    let app = Router::new()
        .route("/api/v1/access_token", post(token))
        .route("/r/rust/new", get(new_listing))
        .route("/api/info", get(info))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), fake)
}

fn feed_for(base: &str) -> RedditFeed {
    let cfg = MonitorConfig {
        app_id: "app".into(),
        app_secret: "secret".into(),
        refresh_token: "refresh".into(),
        subreddit: "rust".into(),
        ..MonitorConfig::default()
    };
    RedditFeed::from_config(&cfg)
        .unwrap()
        .with_endpoints(format!("{base}/api/v1/access_token"), base)
}

#[tokio::test]
async fn fetch_new_parses_listing_and_caches_token() {
    let (base, fake) = start_fake().await;
    let feed = feed_for(&base);

    let posts = feed.fetch_new().await.unwrap();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].id, "1c0003");
    assert_eq!(posts[0].title, "Async traits & you");
    assert_eq!(posts[1].title, "Weekly questions thread");
    assert_eq!(posts[2].score, 15);

    feed.fetch_new().await.unwrap();
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_scores_skips_ids_the_api_no_longer_returns() {
    let (base, _fake) = start_fake().await;
    let feed = feed_for(&base);

    let ids = vec!["1c0001".to_string(), "gone".to_string(), "1c0003".to_string()];
    let scores = feed.fetch_scores(&ids).await.unwrap();
    assert_eq!(
        scores,
        vec![("1c0001".to_string(), 100), ("1c0003".to_string(), 100)]
    );
    assert!(feed.fetch_scores(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_score_batch_keeps_the_other_batches() {
    let (base, _fake) = start_fake().await;
    let feed = feed_for(&base);

    // 150 ids: the first batch of 100 holds the failing id, the second succeeds.
    let mut ids = vec!["broken".to_string()];
    ids.extend((1..150).map(|i| format!("id{i}")));
    let scores = feed.fetch_scores(&ids).await.unwrap();
    assert_eq!(scores.len(), 50);
    assert_eq!(scores[0], ("id100".to_string(), 100));

    // Every batch failing is still an error.
    assert!(feed.fetch_scores(&["broken".to_string()]).await.is_err());
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error_not_a_panic() {
    let feed = feed_for("http://127.0.0.1:9");
    assert!(feed.fetch_new().await.is_err());
}
