// # -----------------------------
// # crates/activity/src/lib.rs
// # -----------------------------
//! Append-only activity log for agents working on tracked issues.
//!
//! Every invocation produces one [`ActivityRecord`] serialised as a single JSON
//! line. The [`ActivityLog`] store appends records and answers the three
//! read-only queries (recent, by issue, by agent).

pub mod config;
pub mod errors;
pub mod record;
pub mod store;

pub use config::{LogConfig, DEFAULT_RECENT_LIMIT};
pub use errors::{ActivityError, ActivityResult, ErrorCategory};
pub use record::{parse_issue_number, ActivityRecord, DEFAULT_AGENT_ID, KNOWN_ACTIONS};
pub use store::ActivityLog;
