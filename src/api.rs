use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::report::{AuthorRank, Report, ReportGenerator};
use crate::submission::SubmissionRecord;
use crate::telemetry::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub reports: ReportGenerator,
}

/// Report routes; `/metrics` is merged in when a recorder is installed.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/report", get(report))
        .route("/report/authors", get(report_authors))
        .route("/report/submissions", get(report_submissions))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

async fn report(State(state): State<AppState>) -> Json<Report> {
    Json(state.reports.report())
}

async fn report_authors(State(state): State<AppState>) -> Json<Vec<AuthorRank>> {
    Json(state.reports.author_ranking())
}

#[derive(Deserialize)]
struct SubmissionsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SubmissionsOut {
    total: usize,
    submissions: Vec<SubmissionRecord>,
}

async fn report_submissions(
    State(state): State<AppState>,
    Query(q): Query<SubmissionsQuery>,
) -> Json<SubmissionsOut> {
    let mut rows = state.reports.submission_ranking();
    let total = rows.len();
    if let Some(n) = q.limit {
        rows.truncate(n);
    }
    Json(SubmissionsOut {
        total,
        submissions: rows,
    })
}
