//! Error types for dev-activity.
//!
//! This module defines the crate-wide error type, wrapping the per-concern
//! errors raised by configuration, recording, watching and backfill.

use thiserror::Error;

use crate::backfill::BackfillError;
use crate::config::ConfigError;
use crate::recorder::RecorderError;
use crate::watcher::WatcherError;

/// Errors that can occur during dev-activity operations.
///
/// Classification failures and malformed log lines are never errors; they
/// are skipped where they occur. Everything that reaches this type is fatal
/// to the operation that raised it.
#[derive(Error, Debug)]
pub enum ActivityError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Appending to the activity log failed.
    #[error("log write error: {0}")]
    Recorder(#[from] RecorderError),

    /// File watching error.
    #[error("file watch error: {0}")]
    Watch(#[from] WatcherError),

    /// Commit backfill error.
    #[error("backfill error: {0}")]
    Backfill(#[from] BackfillError),
}

/// A specialized `Result` type for dev-activity operations.
pub type Result<T> = std::result::Result<T, ActivityError>;
