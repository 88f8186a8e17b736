//! dev-activity - per-project development activity tracker.
//!
//! This crate records which projects under a development folder are being
//! worked on each day and renders that history as a calendar heatmap.
//!
//! # Overview
//!
//! The watcher observes the development folder recursively. Each file change
//! is attributed to the top-level directory it lives under (the project),
//! filtered against build and VCS noise, debounced per project, and appended
//! to a JSON Lines activity log. The report side reads the log back, buckets
//! it by day and project, lays it out as one row per month and emits HTML or
//! JSON. Commit history from GitHub can be appended to the same log.
//!
//! # Modules
//!
//! - [`types`]: Activity log record
//! - [`classify`]: Project resolution and noise filtering
//! - [`debounce`]: Per-project cooldown
//! - [`recorder`]: Append-only log writer
//! - [`watcher`]: File system watcher
//! - [`watch_loop`]: Event consumer tying the above together
//! - [`aggregate`]: Log reader and day/project buckets
//! - [`color`]: Project palette
//! - [`layout`]: Calendar layout
//! - [`render`]: HTML and JSON output
//! - [`backfill`]: GitHub commit backfill
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod aggregate;
pub mod backfill;
pub mod classify;
pub mod color;
pub mod config;
pub mod debounce;
pub mod error;
pub mod layout;
pub mod recorder;
pub mod render;
pub mod types;
pub mod watch_loop;
pub mod watcher;

pub use aggregate::{aggregate_reader, aggregate_str, load_all, ActivityByDay, DayBucket};
pub use backfill::{
    append_backfill, backfill_month, commits_for_month, BackfillError, BackfillMonth,
    BackfillOutcome, GitHubClient,
};
pub use classify::{classify, is_noise, Classification, PathClassifier};
pub use config::Config;
pub use debounce::{ActivityDebouncer, Clock, SystemClock};
pub use error::{ActivityError, Result};
pub use layout::{layout, CalendarLayout, DayCell, Intensity, MonthRow};
pub use recorder::{ActivityRecorder, RecorderError};
pub use render::{render_html, render_json, write_report};
pub use types::{ActivityRecord, ProjectKey};
pub use watch_loop::{EventOutcome, EventWatchLoop, WatchStats};
pub use watcher::{FileWatcher, FsEvent, FsEventKind, WatcherError};
