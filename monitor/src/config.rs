//! Configuration module for dev-activity.
//!
//! This module handles parsing configuration from environment variables.
//! Command-line arguments override these values in the binary.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `DEV_FOLDER` | No | `~/dev` | Root directory whose subfolders are projects |
//! | `DEV_ACTIVITY_LOG` | No | `./activity.jsonl` | Append-only activity log |
//! | `DEV_ACTIVITY_GRAPH` | No | `./activity-graph.html` | Rendered report path |
//! | `DEV_ACTIVITY_COOLDOWN_SECS` | No | 300 | Minimum seconds between records per project |
//! | `DEV_ACTIVITY_BUFFER_SIZE` | No | 1000 | Capacity of the file event channel |
//! | `GITHUB_TOKEN` | No | - | Token used by `backfill-github` |
//! | `DEV_ACTIVITY_GITHUB_API` | No | `https://api.github.com` | GitHub API base URL |
//!
//! # Example
//!
//! ```no_run
//! use dev_activity::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.dev_folder.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

/// Default watched folder relative to home.
const DEFAULT_DEV_DIR: &str = "dev";

/// Default activity log filename, relative to the working directory.
pub const DEFAULT_LOG_FILENAME: &str = "activity.jsonl";

/// Default report filename, relative to the working directory.
pub const DEFAULT_GRAPH_FILENAME: &str = "activity-graph.html";

/// Default debounce window in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = crate::debounce::DEFAULT_COOLDOWN.as_secs();

/// Default file event channel capacity.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,

    /// Failed to determine the current working directory.
    #[error("failed to determine working directory: {0}")]
    NoWorkingDirectory(#[source] std::io::Error),
}

/// Configuration for dev-activity.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory whose immediate subdirectories are projects.
    pub dev_folder: PathBuf,

    /// Path of the append-only activity log.
    pub log_path: PathBuf,

    /// Path the HTML report is written to.
    pub graph_path: PathBuf,

    /// Token for the GitHub API, if configured.
    pub github_token: Option<String>,

    /// GitHub API base URL (overridable for tests and enterprise hosts).
    pub github_api_url: String,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - The home directory cannot be determined and `DEV_FOLDER` is unset
    /// - The working directory cannot be determined and a default path is needed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: DEV_FOLDER (default: ~/dev)
        let dev_folder = match env::var("DEV_FOLDER") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_DEV_DIR)
            }
        };

        let log_path = path_or_cwd_default("DEV_ACTIVITY_LOG", DEFAULT_LOG_FILENAME)?;
        let graph_path = path_or_cwd_default("DEV_ACTIVITY_GRAPH", DEFAULT_GRAPH_FILENAME)?;

        let github_token = env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let github_api_url = env::var("DEV_ACTIVITY_GITHUB_API")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Self {
            dev_folder,
            log_path,
            graph_path,
            github_token,
            github_api_url,
        })
    }
}

/// Settings read only by the watch command.
///
/// Parsed separately from [`Config`]; other commands never see these
/// variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    /// Minimum time between two records for the same project.
    pub cooldown: Duration,

    /// Capacity of the channel between the file watcher and the watch loop.
    pub buffer_size: usize,
}

impl WatchSettings {
    /// Parses the watch settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `DEV_ACTIVITY_COOLDOWN_SECS` or
    /// `DEV_ACTIVITY_BUFFER_SIZE` is set but is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cooldown_secs = parse_positive::<u64>("DEV_ACTIVITY_COOLDOWN_SECS")?
            .unwrap_or(DEFAULT_COOLDOWN_SECS);

        let buffer_size =
            parse_positive::<usize>("DEV_ACTIVITY_BUFFER_SIZE")?.unwrap_or(DEFAULT_BUFFER_SIZE);

        Ok(Self {
            cooldown: Duration::from_secs(cooldown_secs),
            buffer_size,
        })
    }
}

/// Reads a path variable, falling back to `name` inside the working directory.
fn path_or_cwd_default(key: &str, name: &str) -> Result<PathBuf, ConfigError> {
    match env::var(key) {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => {
            let cwd = env::current_dir().map_err(ConfigError::NoWorkingDirectory)?;
            Ok(cwd.join(name))
        }
    }
}

/// Parses an optional integer variable that must be greater than zero.
fn parse_positive<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };

    let parsed = val
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        })?;

    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }

    Ok(Some(parsed))
}
