//! Activity record model and input coercion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ActivityError, ActivityResult};

/// Agent recorded when the caller does not name one.
pub const DEFAULT_AGENT_ID: &str = "unknown";

/// Conventional action tags and what they mean. Actions stay free-form; this
/// list only feeds the usage text.
pub const KNOWN_ACTIONS: &[(&str, &str)] = &[
    ("claim", "Agent claimed an issue"),
    ("abandon", "Agent abandoned an issue"),
    ("state_change", "Issue state changed"),
    ("pr_created", "Pull request created"),
    ("pr_merged", "Pull request merged"),
    ("comment", "Agent commented on issue"),
];

/// One logged activity event. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// UTC instant the record was created
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Free-form action tag (`claim`, `pr_created`, ...)
    pub action: String,

    /// Issue the activity refers to
    pub issue_number: i64,

    /// Agent that performed the action
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Free-form details
    #[serde(default)]
    pub details: String,
}

impl ActivityRecord {
    /// Creates a record stamped with the current time, for the default agent
    /// and with empty details.
    pub fn new(action: impl Into<String>, issue_number: i64) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            issue_number,
            agent_id: DEFAULT_AGENT_ID.to_string(),
            details: String::new(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

fn default_agent_id() -> String {
    DEFAULT_AGENT_ID.to_string()
}

/// Coerces command-line text into an issue number.
///
/// Surrounding whitespace and a leading sign are accepted; anything else is
/// rejected with [`ActivityError::InvalidIssueNumber`].
pub fn parse_issue_number(raw: &str) -> ActivityResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|source| ActivityError::InvalidIssueNumber {
            value: raw.to_string(),
            source,
        })
}

/// RFC 3339 with microseconds and a `Z` suffix on write; any RFC 3339 offset
/// on read.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
