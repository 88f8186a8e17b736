//! dev-activity - per-project development activity tracker.
//!
//! # Commands
//!
//! - `dev-activity watch`: Record activity under the development folder
//! - `dev-activity graph`: Render the activity log as a calendar heatmap
//! - `dev-activity backfill-github`: Append a month of GitHub commits to the log
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use dev_activity::aggregate::load_all;
use dev_activity::backfill::{backfill_month, BackfillMonth, BackfillOutcome, GitHubClient};
use dev_activity::classify::PathClassifier;
use dev_activity::config::{Config, WatchSettings};
use dev_activity::layout::layout;
use dev_activity::recorder::ActivityRecorder;
use dev_activity::render::{render_html, render_json, write_report};
use dev_activity::watch_loop::EventWatchLoop;
use dev_activity::watcher::FileWatcher;

/// dev-activity - per-project development activity tracker.
///
/// Watches a development folder, records which projects change each day,
/// and renders the history as a calendar heatmap.
#[derive(Parser, Debug)]
#[command(name = "dev-activity")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    DEV_FOLDER                  Folder to watch (default: ~/dev)
    DEV_ACTIVITY_LOG            Activity log (default: ./activity.jsonl)
    DEV_ACTIVITY_GRAPH          Report file (default: ./activity-graph.html)
    DEV_ACTIVITY_COOLDOWN_SECS  Per-project cooldown, 'watch' only (default: 300)
    DEV_ACTIVITY_BUFFER_SIZE    Event channel capacity, 'watch' only (default: 1000)
    GITHUB_TOKEN                Token for 'backfill-github'
    DEV_ACTIVITY_GITHUB_API     GitHub API base URL (default: https://api.github.com)

EXAMPLES:
    # Watch ~/dev until Ctrl+C
    dev-activity watch

    # Render and open the heatmap
    dev-activity graph --open

    # Append last March's commits
    GITHUB_TOKEN=... dev-activity backfill-github --year 2024 --month 3
")]
struct Cli {
    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a folder and record per-project activity.
    ///
    /// Runs until interrupted with Ctrl+C or SIGTERM.
    Watch {
        /// Folder to watch (default: DEV_FOLDER or ~/dev).
        path: Option<PathBuf>,

        /// Activity log file.
        #[arg(long)]
        log: Option<PathBuf>,

        /// Minimum seconds between two records for the same project.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cooldown_secs: Option<u64>,
    },

    /// Render the activity log as a calendar heatmap.
    Graph {
        /// Activity log file.
        #[arg(long)]
        log: Option<PathBuf>,

        /// Output file.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the layout as JSON instead of HTML.
        #[arg(long)]
        json: bool,

        /// Open the report when done.
        #[arg(long)]
        open: bool,
    },

    /// Append a month of GitHub commits to the log.
    ///
    /// Requires GITHUB_TOKEN.
    BackfillGithub {
        /// Year (default: current).
        #[arg(long)]
        year: Option<i32>,

        /// Month, 1-12 (default: current).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,

        /// Activity log file.
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Watch {
            path,
            log,
            cooldown_secs,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_watch(config, path, log, cooldown_secs))
        }
        Command::Graph {
            log,
            out,
            json,
            open,
        } => run_graph(&config, log, out, json, open),
        Command::BackfillGithub { year, month, log } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_backfill(config, year, month, log))
        }
    }
}

/// Runs the watch command until a shutdown signal arrives.
async fn run_watch(
    config: Config,
    path: Option<PathBuf>,
    log: Option<PathBuf>,
    cooldown_secs: Option<u64>,
) -> Result<()> {
    let root = path.unwrap_or(config.dev_folder);
    if !root.is_dir() {
        bail!("Dev folder does not exist: {}", root.display());
    }

    let settings = WatchSettings::from_env().context("Failed to load watch settings")?;
    let log_path = log.unwrap_or(config.log_path);
    let cooldown = cooldown_secs.map_or(settings.cooldown, std::time::Duration::from_secs);

    info!(
        root = %root.display(),
        log = %log_path.display(),
        cooldown_secs = cooldown.as_secs(),
        "Starting dev-activity watch"
    );

    let classifier = PathClassifier::new(&root, vec![log_path.clone(), config.graph_path])
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    let recorder = ActivityRecorder::new(log_path);

    let (tx, rx) = mpsc::channel(settings.buffer_size);
    let watcher = FileWatcher::new(root, tx).context("Failed to start file watcher")?;

    let stats = EventWatchLoop::new(classifier, recorder, cooldown)
        .run(rx, wait_for_shutdown())
        .await
        .context("Watch loop failed")?;

    drop(watcher);

    info!(
        events = stats.events,
        recorded = stats.recorded,
        noise = stats.noise,
        debounced = stats.debounced,
        "dev-activity watch stopped"
    );

    Ok(())
}

/// Runs the graph command.
fn run_graph(
    config: &Config,
    log: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
    open: bool,
) -> Result<()> {
    let log_path = log.unwrap_or_else(|| config.log_path.clone());
    let out_path = out.unwrap_or_else(|| {
        if json {
            config.graph_path.with_extension("json")
        } else {
            config.graph_path.clone()
        }
    });

    let activity = load_all(&log_path)
        .with_context(|| format!("Failed to read activity log {}", log_path.display()))?;
    let calendar = layout(&activity, Local::now().date_naive());

    info!(
        days = activity.len(),
        records = activity.total_records(),
        months = calendar.months.len(),
        "Laid out activity"
    );

    let contents = if json {
        render_json(&calendar).context("Failed to serialize layout")?
    } else {
        render_html(&calendar)
    };

    write_report(&out_path, &contents)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    println!("Wrote {}", out_path.display());

    if open {
        open_in_browser(&out_path);
    }

    Ok(())
}

/// Runs the backfill-github command.
async fn run_backfill(
    config: Config,
    year: Option<i32>,
    month: Option<u32>,
    log: Option<PathBuf>,
) -> Result<()> {
    let current = BackfillMonth::current();
    let month = BackfillMonth::new(
        year.unwrap_or(current.year()),
        month.unwrap_or(current.month()),
    )?;
    let log_path = log.unwrap_or(config.log_path);

    let client = GitHubClient::new(config.github_api_url, config.github_token)
        .context("Failed to create GitHub client")?;
    let recorder = ActivityRecorder::new(&log_path);

    match backfill_month(&client, &recorder, month).await? {
        BackfillOutcome::NothingToAdd => println!("No commits found for {month}."),
        BackfillOutcome::Appended(n) => println!(
            "Appended {n} entries from GitHub ({month}) to {}",
            log_path.display()
        ),
    }

    Ok(())
}

/// Hands `path` to the platform's default opener.
fn open_in_browser(path: &Path) {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };

    let result = command
        .arg(&path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to open report");
    }
}

/// Initializes the tracing subscriber for logging.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
