//! Appending records to the activity log.
//!
//! The log is a JSON Lines file. Each record is serialized into one
//! newline-terminated line and written with a single `write_all` on a file
//! opened in append mode, so writers from earlier runs (or a concurrent
//! backfill) never truncate data that is already there.
//!
//! The recorder never reads the log. Write failures are returned to the
//! caller as-is; there is no retry.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::ActivityRecord;

/// Errors that can occur while appending to the log.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The log could not be opened or written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Log file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Appends [`ActivityRecord`]s to a JSON Lines file.
#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    path: PathBuf,
}

impl ActivityRecorder {
    /// Creates a recorder writing to `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record for `project` accepted at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `RecorderError` if the log cannot be opened or written.
    pub fn append<Tz>(
        &self,
        project: &str,
        timestamp: DateTime<Tz>,
    ) -> Result<ActivityRecord, RecorderError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let record = ActivityRecord::at(project, timestamp);
        self.append_records(std::slice::from_ref(&record))?;
        info!(project = %record.project, date = %record.date, "Recorded activity");
        Ok(record)
    }

    /// Appends `records` in order, one line each, with a single open.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns `RecorderError` if serialization fails or the log cannot be
    /// opened or written. Serialization happens before the file is touched.
    pub fn append_records(&self, records: &[ActivityRecord]) -> Result<usize, RecorderError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&record.to_line()?);
        }

        self.write_all(buf.as_bytes())?;

        debug!(
            path = %self.path.display(),
            count = records.len(),
            "Appended records"
        );
        Ok(records.len())
    }

    fn write_all(&self, bytes: &[u8]) -> Result<(), RecorderError> {
        let io_err = |source| RecorderError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;

        file.write_all(bytes).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};

    #[test]
    fn append_creates_file_and_writes_line() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ActivityRecorder::new(dir.path().join("activity.jsonl"));
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

        let record = recorder.append("alpha", ts).unwrap();

        let content = fs::read_to_string(recorder.path()).unwrap();
        assert_eq!(content, record.to_line().unwrap());
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        fs::write(&path, "{\"date\":\"2023-12-31\",\"ts\":\"x\",\"project\":\"old\"}\n").unwrap();

        let recorder = ActivityRecorder::new(&path);
        recorder.append("alpha", Local::now()).unwrap();
        recorder.append("beta", Local::now()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"old\""));
        assert!(lines[1].contains("\"alpha\""));
        assert!(lines[2].contains("\"beta\""));
    }

    #[test]
    fn append_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ActivityRecorder::new(dir.path().join("nested/logs/activity.jsonl"));

        recorder.append("alpha", Local::now()).unwrap();

        assert!(recorder.path().exists());
    }

    #[test]
    fn append_records_writes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ActivityRecorder::new(dir.path().join("activity.jsonl"));
        let ts = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let records = vec![
            ActivityRecord::at("a", ts),
            ActivityRecord::at("b", ts),
            ActivityRecord::at("c", ts),
        ];

        assert_eq!(recorder.append_records(&records).unwrap(), 3);
        assert_eq!(recorder.append_records(&[]).unwrap(), 0);

        let content = fs::read_to_string(recorder.path()).unwrap();
        let parsed: Vec<ActivityRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, records);
    }

    #[test]
    fn append_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let recorder = ActivityRecorder::new(dir.path());

        let err = recorder.append("alpha", Local::now()).unwrap_err();

        assert!(matches!(err, RecorderError::Io { .. }));
        assert!(err.to_string().starts_with("failed to write"));
    }
}
