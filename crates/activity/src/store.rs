//! # Activity Log Store
//!
//! Append-only JSONL storage for [`ActivityRecord`]s.
//!
//! ## Format
//!
//! One JSON object per line, keys in the order
//! `timestamp, action, issue_number, agent_id, details`. The file is never
//! rewritten or truncated by this crate.
//!
//! ## Reads
//!
//! All queries load the file into memory and scan it. A missing file reads as
//! an empty log. Lines that are blank, not JSON, or JSON that does not describe
//! a record are skipped (logged at `debug`) and never reported as errors.
//! A JSON object missing a field or carrying a non-RFC 3339 `timestamp` counts
//! as malformed: queries return typed records, so there is nothing to hand back
//! for a line that cannot become one.
//!
//! ## Concurrency
//!
//! Appends hold an exclusive `flock`-style advisory lock while the line is
//! written; reads hold a shared lock. Writers that bypass this crate are not
//! serialised.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::config::LogConfig;
use crate::errors::{ActivityError, ActivityResult};
use crate::record::{parse_issue_number, ActivityRecord};

/// Handle on one activity log file.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.log_file.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds a record from raw command-line values and appends it.
    ///
    /// The issue number is coerced before anything touches the filesystem, so
    /// a bad value leaves the log unchanged.
    ///
    /// # Errors
    /// * `E_INVALID_ISSUE` - `issue_number` is not an integer
    /// * `E_IO` - the log directory or file cannot be written
    pub fn log_activity(
        &self,
        action: &str,
        issue_number: &str,
        agent_id: &str,
        details: &str,
    ) -> ActivityResult<ActivityRecord> {
        let issue_number = parse_issue_number(issue_number)?;
        let record = ActivityRecord::new(action, issue_number)
            .with_agent(agent_id)
            .with_details(details);

        self.append(&record)?;
        Ok(record)
    }

    /// Appends an already-built record as one line.
    pub fn append(&self, record: &ActivityRecord) -> ActivityResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ActivityError::io(Some(parent.to_path_buf()), "create log directory", e)
                })?;
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ActivityError::io(Some(self.path.clone()), "open activity log", e))?;

        FileExt::lock_exclusive(&file)
            .map_err(|e| ActivityError::io(Some(self.path.clone()), "lock activity log", e))?;

        // Whole line in one write so readers never see a partial record.
        file.write_all(line.as_bytes()).map_err(|e| {
            ActivityError::io(Some(self.path.clone()), "write activity record", e)
        })?;
        drop(file); // releases the lock

        tracing::debug!(
            path = %self.path.display(),
            action = %record.action,
            issue = record.issue_number,
            agent = %record.agent_id,
            "activity appended"
        );
        Ok(())
    }

    /// Returns the records found in the last `limit` lines, oldest first.
    ///
    /// The window is counted in lines, so unparseable lines inside it make the
    /// result shorter than `limit`.
    pub fn get_recent_activity(&self, limit: usize) -> ActivityResult<Vec<ActivityRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let lines = self.read_lines()?;
        let start = lines.len().saturating_sub(limit);
        Ok(lines
            .iter()
            .enumerate()
            .skip(start)
            .filter_map(|(idx, line)| self.parse_line(idx + 1, line))
            .collect())
    }

    /// All records for `issue_number`, in append order.
    pub fn get_activity_for_issue(&self, issue_number: i64) -> ActivityResult<Vec<ActivityRecord>> {
        self.scan(|record| record.issue_number == issue_number)
    }

    /// All records written by `agent_id`, in append order.
    pub fn get_activity_for_agent(&self, agent_id: &str) -> ActivityResult<Vec<ActivityRecord>> {
        self.scan(|record| record.agent_id == agent_id)
    }

    /// Every parseable record in the log.
    pub fn read_all(&self) -> ActivityResult<Vec<ActivityRecord>> {
        self.scan(|_| true)
    }

    fn scan<F>(&self, mut keep: F) -> ActivityResult<Vec<ActivityRecord>>
    where
        F: FnMut(&ActivityRecord) -> bool,
    {
        let lines = self.read_lines()?;
        Ok(lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| self.parse_line(idx + 1, line))
            .filter(|record| keep(record))
            .collect())
    }

    fn read_lines(&self) -> ActivityResult<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "activity log absent");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ActivityError::io(
                    Some(self.path.clone()),
                    "open activity log",
                    e,
                ))
            }
        };

        FileExt::lock_shared(&file)
            .map_err(|e| ActivityError::io(Some(self.path.clone()), "lock activity log", e))?;

        // Split on raw bytes: invalid UTF-8 must only spoil its own line.
        let mut lines = Vec::new();
        for chunk in BufReader::new(&file).split(b'\n') {
            let bytes = chunk.map_err(|e| {
                ActivityError::io(Some(self.path.clone()), "read activity log", e)
            })?;
            lines.push(String::from_utf8_lossy(&bytes).into_owned());
        }

        Ok(lines)
    }

    fn parse_line(&self, line_number: usize, line: &str) -> Option<ActivityRecord> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str(trimmed) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    line = line_number,
                    error = %e,
                    "skipping malformed activity line"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn temp_log() -> (TempDir, ActivityLog) {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("logs").join("activity_log.jsonl"));
        (dir, log)
    }

    fn append_raw(log: &ActivityLog, text: &str) {
        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log.path())
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn log_activity_creates_directory_and_writes_one_line() {
        let (_dir, log) = temp_log();
        assert!(!log.path().parent().unwrap().exists());

        let record = log.log_activity("claim", "22", "agent-1", "").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["action"], "claim");
        assert_eq!(value["issue_number"], 22);
        assert_eq!(value["agent_id"], "agent-1");
        assert_eq!(value["details"], "");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(record.issue_number, 22);
    }

    #[test]
    fn invalid_issue_number_writes_nothing() {
        let (_dir, log) = temp_log();

        let err = log.log_activity("claim", "twenty", "agent-1", "").unwrap_err();

        assert!(matches!(err, ActivityError::InvalidIssueNumber { .. }));
        assert!(!log.path().exists());
    }

    #[test]
    fn appended_record_is_last_in_recent_activity() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "1", "agent-1", "").unwrap();
        log.log_activity("comment", "2", "agent-2", "first look").unwrap();
        let last = log
            .log_activity("pr_created", "1", "agent-1", "PR #27")
            .unwrap();

        let recent = log.get_recent_activity(100).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last(), Some(&last));
    }

    #[test]
    fn recent_activity_keeps_file_order_within_limit() {
        let (_dir, log) = temp_log();
        for issue in 1..=5 {
            log.log_activity("claim", &issue.to_string(), "agent-1", "").unwrap();
        }

        let recent = log.get_recent_activity(2).unwrap();
        let issues: Vec<i64> = recent.iter().map(|r| r.issue_number).collect();
        assert_eq!(issues, vec![4, 5]);

        assert!(log.get_recent_activity(0).unwrap().is_empty());
        assert_eq!(log.get_recent_activity(50).unwrap().len(), 5);
    }

    #[test]
    fn recent_window_counts_malformed_lines() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "1", "agent-1", "").unwrap();
        log.log_activity("claim", "2", "agent-1", "").unwrap();
        append_raw(&log, "{not json\n");

        let recent = log.get_recent_activity(2).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].issue_number, 2);
    }

    #[test]
    fn issue_filter_returns_matching_subset_in_order() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "22", "agent-1", "").unwrap();
        log.log_activity("claim", "23", "agent-2", "").unwrap();
        log.log_activity("state_change", "22", "agent-1", "implementing -> testing")
            .unwrap();
        log.log_activity("pr_created", "22", "agent-1", "PR #27").unwrap();

        let actions: Vec<String> = log
            .get_activity_for_issue(22)
            .unwrap()
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(actions, vec!["claim", "state_change", "pr_created"]);
        assert!(log.get_activity_for_issue(99).unwrap().is_empty());
    }

    #[test]
    fn agent_filter_is_exact_match() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "1", "agent-1", "").unwrap();
        log.log_activity("claim", "2", "agent-10", "").unwrap();
        log.log_activity("comment", "3", "agent-1", "").unwrap();
        log.log_activity("comment", "4", "unknown", "").unwrap();

        let issues: Vec<i64> = log
            .get_activity_for_agent("agent-1")
            .unwrap()
            .iter()
            .map(|r| r.issue_number)
            .collect();
        assert_eq!(issues, vec![1, 3]);
        assert_eq!(log.get_activity_for_agent("Agent-1").unwrap().len(), 0);
    }

    #[test]
    fn malformed_lines_are_skipped_everywhere() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "7", "agent-1", "").unwrap();
        append_raw(&log, "garbage\n\n[1,2,3]\n{\"action\":\"claim\"}\n");
        append_raw(&log, "{\"timestamp\":\"yesterday\",\"action\":\"x\",\"issue_number\":7}\n");
        append_raw(&log, "\u{fffd}\u{0}\n");
        log.log_activity("abandon", "7", "agent-1", "").unwrap();

        assert_eq!(log.read_all().unwrap().len(), 2);
        assert_eq!(log.get_recent_activity(100).unwrap().len(), 2);
        assert_eq!(log.get_activity_for_issue(7).unwrap().len(), 2);
        assert_eq!(log.get_activity_for_agent("agent-1").unwrap().len(), 2);
    }

    #[test]
    fn invalid_utf8_only_spoils_its_line() {
        let (_dir, log) = temp_log();
        log.log_activity("claim", "3", "agent-1", "").unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        drop(file);
        log.log_activity("comment", "3", "agent-1", "").unwrap();

        assert_eq!(log.get_activity_for_issue(3).unwrap().len(), 2);
    }

    #[test]
    fn records_written_by_older_tools_are_readable() {
        let (_dir, log) = temp_log();
        append_raw(
            &log,
            "{\"timestamp\": \"2024-06-01T08:30:00.123456Z\", \"action\": \"claim\", \"issue_number\": 22, \"agent_id\": \"agent-1\", \"details\": \"\"}\r\n",
        );

        let records = log.get_activity_for_issue(22).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "agent-1");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_dir, log) = temp_log();

        assert!(log.get_recent_activity(100).unwrap().is_empty());
        assert!(log.get_activity_for_issue(1).unwrap().is_empty());
        assert!(log.get_activity_for_agent("agent-1").unwrap().is_empty());
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn directory_in_place_of_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path());

        let err = log.log_activity("claim", "1", "agent-1", "").unwrap_err();
        assert_eq!(err.error_code(), "E_IO");
    }

    #[test]
    fn concurrent_appends_stay_line_atomic() {
        let (_dir, log) = temp_log();
        let log = Arc::new(log);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        log.log_activity(
                            "comment",
                            &worker.to_string(),
                            &format!("agent-{worker}"),
                            &"x".repeat(512 + n),
                        )
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 200);
        assert_eq!(log.read_all().unwrap().len(), 200);
        assert_eq!(log.get_activity_for_agent("agent-3").unwrap().len(), 25);
    }
}
