//! Record types for the activity log.
//!
//! One [`ActivityRecord`] is written per accepted occurrence, serialized as a
//! single JSON object per line:
//!
//! ```text
//! {"date":"2024-01-05","ts":"2024-01-05T14:03:11.120+01:00","project":"alpha"}
//! ```

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Identifier of a project: the first path segment under the watched root.
pub type ProjectKey = String;

/// A single line of the activity log.
///
/// Records are immutable once written and are only ever aggregated, never
/// looked up individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Calendar day the occurrence is bucketed under.
    pub date: NaiveDate,

    /// ISO-8601 timestamp of the occurrence, offset-aware or naive.
    pub ts: String,

    /// Project the occurrence is attributed to.
    pub project: ProjectKey,
}

impl ActivityRecord {
    /// Creates a record for an occurrence accepted at `timestamp`.
    ///
    /// The day is taken from the timestamp's own wall clock, so `date` always
    /// matches the date portion of `ts`.
    #[must_use]
    pub fn at<Tz>(project: impl Into<ProjectKey>, timestamp: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date: timestamp.date_naive(),
            ts: timestamp.to_rfc3339(),
            project: project.into(),
        }
    }

    /// Creates a record for an occurrence happening now in local time.
    #[must_use]
    pub fn now(project: impl Into<ProjectKey>) -> Self {
        Self::at(project, Local::now())
    }

    /// Serializes the record as one newline-terminated log line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
