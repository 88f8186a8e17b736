//! Aggregating the activity log into per-day project counts.
//!
//! The whole log is replayed on every report. Each line is parsed on its own;
//! anything that is not a JSON object with a valid `date` and a non-empty
//! `project` is skipped, so a line torn by a crash or by a concurrent append
//! costs exactly that line and nothing else.
//!
//! # Example
//!
//! ```
//! use dev_activity::aggregate::aggregate_str;
//!
//! let log = r#"{"date":"2024-01-05","ts":"2024-01-05T10:00:00","project":"alpha"}
//! {"date":"2024-01-05","project":"al
//! {"date":"2024-01-05","ts":"2024-01-05T11:00:00","project":"beta"}
//! "#;
//! let activity = aggregate_str(log);
//!
//! assert_eq!(activity.total_records(), 2);
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::ProjectKey;

/// Occurrence counts per project for one day, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayBucket {
    counts: Vec<(ProjectKey, u32)>,
}

impl DayBucket {
    /// Adds `n` occurrences for `project`.
    pub fn add(&mut self, project: &str, n: u32) {
        match self.counts.iter_mut().find(|(p, _)| p == project) {
            Some((_, count)) => *count += n,
            None => self.counts.push((project.to_string(), n)),
        }
    }

    /// Returns the count for `project`, zero if absent.
    #[must_use]
    pub fn count(&self, project: &str) -> u32 {
        self.counts
            .iter()
            .find(|(p, _)| p == project)
            .map_or(0, |(_, c)| *c)
    }

    /// Total occurrences across all projects.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    /// Iterates `(project, count)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(p, c)| (p.as_str(), *c))
    }

    /// Number of distinct projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no project was active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Day → project → count, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityByDay {
    days: BTreeMap<NaiveDate, DayBucket>,
}

impl ActivityByDay {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `project` on `date`.
    pub fn record(&mut self, date: NaiveDate, project: &str) {
        self.days.entry(date).or_default().add(project, 1);
    }

    /// Returns the bucket for `date`.
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.get(&date)
    }

    /// Iterates days in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DayBucket)> {
        self.days.iter().map(|(d, b)| (*d, b))
    }

    /// Earliest day with activity.
    #[must_use]
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    /// Number of days with activity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Returns `true` if there is no activity at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of records aggregated.
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.days.values().map(|b| u64::from(b.total())).sum()
    }

    /// Projects in order of first appearance: by day, then within a day.
    #[must_use]
    pub fn projects_in_order(&self) -> Vec<ProjectKey> {
        let mut order: Vec<ProjectKey> = Vec::new();
        for bucket in self.days.values() {
            for (project, _) in bucket.iter() {
                if !order.iter().any(|p| p == project) {
                    order.push(project.to_string());
                }
            }
        }
        order
    }

    /// Adds every count of `other` into `self`.
    pub fn merge(&mut self, other: &ActivityByDay) {
        for (date, bucket) in other.iter() {
            let target = self.days.entry(date).or_default();
            for (project, count) in bucket.iter() {
                target.add(project, count);
            }
        }
    }
}

/// Fields read from one log line; everything else is ignored.
#[derive(Debug, Deserialize)]
struct LogLine {
    date: Option<String>,
    project: Option<String>,
}

/// Parses one log line, returning `None` for anything unusable.
fn parse_line(line: &str) -> Option<(NaiveDate, String)> {
    let entry: LogLine = serde_json::from_str(line).ok()?;
    let date = NaiveDate::parse_from_str(entry.date?.trim(), "%Y-%m-%d").ok()?;
    let project = entry.project.filter(|p| !p.is_empty())?;
    Some((date, project))
}

/// Aggregates log lines from `reader`.
///
/// Lines that are not valid UTF-8 or fail to parse are skipped.
///
/// # Errors
///
/// Returns an I/O error only if reading from `reader` itself fails.
pub fn aggregate_reader<R: BufRead>(reader: R) -> std::io::Result<ActivityByDay> {
    let mut activity = ActivityByDay::new();
    let mut skipped = 0_usize;

    for (index, chunk) in reader.split(b'\n').enumerate() {
        let bytes = chunk?;
        let Ok(text) = std::str::from_utf8(&bytes) else {
            debug!(line = index + 1, "Skipping non-UTF-8 log line");
            skipped += 1;
            continue;
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match parse_line(text) {
            Some((date, project)) => activity.record(date, &project),
            None => {
                debug!(line = index + 1, "Skipping malformed log line");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        info!(skipped, "Skipped malformed log lines");
    }

    Ok(activity)
}

/// Aggregates log content held in memory.
#[must_use]
pub fn aggregate_str(content: &str) -> ActivityByDay {
    let mut activity = ActivityByDay::new();
    for line in content.lines() {
        if let Some((date, project)) = parse_line(line.trim()) {
            activity.record(date, &project);
        }
    }
    activity
}

/// Loads and aggregates the log at `path`.
///
/// A missing log is not an error and yields an empty mapping. The log is
/// only read, never modified.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be opened or read.
pub fn load_all(path: &Path) -> std::io::Result<ActivityByDay> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No activity log yet");
            return Ok(ActivityByDay::new());
        }
        Err(e) => return Err(e),
    };

    let activity = aggregate_reader(BufReader::new(file))?;

    debug!(
        path = %path.display(),
        days = activity.len(),
        records = activity.total_records(),
        "Loaded activity log"
    );

    Ok(activity)
}
