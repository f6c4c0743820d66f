//! # Activity Log Error Types
//!
//! Every fallible operation of the crate returns [`ActivityResult`]. Variants
//! carry enough context to produce a useful message on the command line and a
//! stable error code for scripts.

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// Bad input from the caller (arguments, config values)
    Validation,
    /// I/O and encoding failures
    System,
}

/// Result type for all activity log operations.
pub type ActivityResult<T> = Result<T, ActivityError>;

#[derive(Debug, Error)]
pub enum ActivityError {
    /// E_INVALID_ISSUE - Issue number is not an integer
    ///
    /// Raised before anything is written; the log is left untouched.
    #[error("Invalid issue number '{value}': {source}")]
    InvalidIssueNumber {
        /// Raw text that was supplied
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// E_IO - Filesystem operation failed
    #[error("I/O error in {operation}: {source}")]
    Io {
        /// Operation that was being performed
        operation: String,
        /// Path involved in the operation (if applicable)
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// E_SERIALIZE - Record could not be encoded as JSON
    #[error("Failed to serialize activity record: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    /// E_CONFIG - Configuration file is unreadable or invalid
    #[error("Invalid configuration in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

impl ActivityError {
    /// Builds an I/O error with an optional path and the operation name.
    pub fn io<P, S>(path: P, operation: S, source: std::io::Error) -> Self
    where
        P: Into<Option<PathBuf>>,
        S: Into<String>,
    {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidIssueNumber { .. } => "E_INVALID_ISSUE",
            Self::Io { .. } => "E_IO",
            Self::Serialize { .. } => "E_SERIALIZE",
            Self::Config { .. } => "E_CONFIG",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIssueNumber { .. } | Self::Config { .. } => ErrorCategory::Validation,
            Self::Io { .. } | Self::Serialize { .. } => ErrorCategory::System,
        }
    }
}
