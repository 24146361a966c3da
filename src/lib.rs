// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bridge;
pub mod config;
pub mod console;
pub mod feed;
pub mod report;
pub mod session;
pub mod store;
pub mod submission;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::bridge::{EventBridge, FeedEvent};
pub use crate::report::{AuthorRank, Report, ReportGenerator};
pub use crate::session::MonitorSession;
pub use crate::store::{IngestOutcome, StoreSnapshot, SubmissionStore};
pub use crate::submission::SubmissionRecord;
