//! File watcher for the dev folder.
//!
//! This module bridges the [`notify`] crate to the watch loop. notify invokes
//! its callback on its own thread(s); the callback here only converts raw
//! notifications into [`FsEvent`]s and pushes them into a bounded channel.
//! Every decision (noise, classification, debounce, recording) happens on the
//! single consumer of that channel, see [`crate::watch_loop`].
//!
//! # Event Mapping
//!
//! | notify kind | [`FsEventKind`] |
//! |-------------|-----------------|
//! | `Create(_)` | `Created` |
//! | `Modify(Data / Metadata / Any / Other)` | `Modified` |
//! | `Modify(Name(To))`, `Modify(Name(Any))` | `Moved` (path as given) |
//! | `Modify(Name(Both))` | `Moved` (destination path) |
//! | `Modify(Name(From))` | ignored |
//! | `Remove(_)` | `Deleted` |
//! | `Access(_)`, `Any`, `Other` | ignored |
//!
//! The source path of a move is never reported: activity is attributed to
//! where the content now lives.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tokio::sync::mpsc;
//! use dev_activity::watcher::FileWatcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let _watcher = FileWatcher::new(PathBuf::from("/home/me/dev"), tx)?;
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?} {}", event.kind, event.path.display());
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

/// Kind of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// A file or directory was created.
    Created,
    /// Contents or metadata changed.
    Modified,
    /// A file or directory was removed.
    Deleted,
    /// A rename; carries the destination path only.
    Moved,
}

/// A path-level change notification under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// What happened.
    pub kind: FsEventKind,
    /// Affected path (the destination for moves).
    pub path: PathBuf,
    /// Whether the change concerns a directory rather than a file.
    pub is_dir: bool,
}

impl FsEvent {
    /// Creates a file event.
    #[must_use]
    pub fn file(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: false,
        }
    }

    /// Creates a directory event.
    #[must_use]
    pub fn directory(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: true,
        }
    }
}

/// Errors that can occur during file watching operations.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// The watch directory does not exist or is not a directory.
    #[error("watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Recursive watcher over the dev folder.
///
/// Keeps the OS subscription alive; dropping it stops delivery. Once dropped,
/// the channel sender held by the callback is released too, so the receiving
/// side observes the channel closing.
#[derive(Debug)]
pub struct FileWatcher {
    /// The underlying file system watcher.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,

    /// The root directory being watched.
    watch_dir: PathBuf,
}

impl FileWatcher {
    /// Starts watching `watch_dir` recursively, sending events to `event_sender`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The watch directory does not exist or is not a directory
    /// - The file system watcher cannot be initialized
    pub fn new(watch_dir: PathBuf, event_sender: mpsc::Sender<FsEvent>) -> Result<Self> {
        if !watch_dir.is_dir() {
            return Err(WatcherError::DirectoryNotFound(watch_dir));
        }

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                handle_notify_event(res, &event_sender);
            },
            Config::default(),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::Recursive)?;

        info!(
            watch_dir = %watch_dir.display(),
            "Started recursive file watch"
        );

        Ok(Self { watcher, watch_dir })
    }

    /// Returns the directory being watched.
    #[must_use]
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }
}

/// Handles events from the notify crate.
///
/// Runs on notify's thread and must not block: a full channel drops the event.
fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    sender: &mpsc::Sender<FsEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    for fs_event in to_fs_events(&event) {
        queue_event(sender, fs_event);
    }
}

/// Pushes one event without blocking. Returns `false` if it was dropped.
fn queue_event(sender: &mpsc::Sender<FsEvent>, event: FsEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!(path = %event.path.display(), "Event channel full, dropping file event");
            false
        }
        Err(TrySendError::Closed(event)) => {
            trace!(path = %event.path.display(), "Watch loop stopped, dropping file event");
            false
        }
    }
}

/// Converts one notify event into zero or more [`FsEvent`]s.
#[must_use]
pub fn to_fs_events(event: &Event) -> Vec<FsEvent> {
    let (kind, dir_hint) = match event.kind {
        EventKind::Create(CreateKind::Folder) => (FsEventKind::Created, Some(true)),
        EventKind::Create(CreateKind::File) => (FsEventKind::Created, Some(false)),
        EventKind::Create(_) => (FsEventKind::Created, None),
        EventKind::Remove(RemoveKind::Folder) => (FsEventKind::Deleted, Some(true)),
        EventKind::Remove(RemoveKind::File) => (FsEventKind::Deleted, Some(false)),
        EventKind::Remove(_) => (FsEventKind::Deleted, None),
        EventKind::Modify(ModifyKind::Name(mode)) => {
            return moved_events(mode, &event.paths);
        }
        EventKind::Modify(_) => (FsEventKind::Modified, None),
        _ => {
            trace!(kind = ?event.kind, "Ignoring event kind");
            return Vec::new();
        }
    };

    event
        .paths
        .iter()
        .map(|path| FsEvent {
            kind,
            path: path.clone(),
            is_dir: dir_hint.unwrap_or_else(|| path.is_dir()),
        })
        .collect()
}

/// Maps a rename notification to the destination it produced.
fn moved_events(mode: RenameMode, paths: &[PathBuf]) -> Vec<FsEvent> {
    let destinations: Vec<&PathBuf> = match mode {
        RenameMode::From => {
            debug!(paths = ?paths, "Ignoring rename source");
            Vec::new()
        }
        // notify reports [from, to]
        RenameMode::Both => paths.last().into_iter().collect(),
        _ => paths.iter().collect(),
    };

    destinations
        .into_iter()
        .map(|path| FsEvent {
            kind: FsEventKind::Moved,
            path: path.clone(),
            is_dir: path.is_dir(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};
    use std::fs;
    use std::time::Duration;
    use tokio::time::timeout;

    fn notify_event(kind: EventKind, paths: &[&Path]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(p.to_path_buf()))
    }

    #[test]
    fn create_file_maps_to_created() {
        let events = to_fs_events(&notify_event(
            EventKind::Create(CreateKind::File),
            &[Path::new("/dev/alpha/a.rs")],
        ));
        assert_eq!(
            events,
            vec![FsEvent::file(FsEventKind::Created, "/dev/alpha/a.rs")]
        );
    }

    #[test]
    fn create_folder_is_directory() {
        let events = to_fs_events(&notify_event(
            EventKind::Create(CreateKind::Folder),
            &[Path::new("/dev/alpha/src")],
        ));
        assert_eq!(
            events,
            vec![FsEvent::directory(FsEventKind::Created, "/dev/alpha/src")]
        );
    }

    #[test]
    fn data_and_metadata_changes_map_to_modified() {
        for kind in [
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            EventKind::Modify(ModifyKind::Any),
        ] {
            let events = to_fs_events(&notify_event(kind, &[Path::new("/dev/alpha/a.rs")]));
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, FsEventKind::Modified);
        }
    }

    #[test]
    fn remove_maps_to_deleted() {
        let events = to_fs_events(&notify_event(
            EventKind::Remove(RemoveKind::File),
            &[Path::new("/dev/alpha/a.rs")],
        ));
        assert_eq!(
            events,
            vec![FsEvent::file(FsEventKind::Deleted, "/dev/alpha/a.rs")]
        );
    }

    #[test]
    fn rename_both_reports_destination_only() {
        let events = to_fs_events(&notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &[Path::new("/dev/alpha/old.rs"), Path::new("/dev/beta/new.rs")],
        ));
        assert_eq!(
            events,
            vec![FsEvent::file(FsEventKind::Moved, "/dev/beta/new.rs")]
        );
    }

    #[test]
    fn rename_from_is_ignored() {
        let events = to_fs_events(&notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &[Path::new("/dev/alpha/old.rs")],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn rename_to_reports_path() {
        let events = to_fs_events(&notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &[Path::new("/dev/alpha/new.rs")],
        ));
        assert_eq!(
            events,
            vec![FsEvent::file(FsEventKind::Moved, "/dev/alpha/new.rs")]
        );
    }

    #[test]
    fn access_events_are_ignored() {
        let events = to_fs_events(&notify_event(
            EventKind::Access(AccessKind::Read),
            &[Path::new("/dev/alpha/a.rs")],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn ambiguous_kind_checks_filesystem_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let events = to_fs_events(&notify_event(
            EventKind::Modify(ModifyKind::Any),
            &[dir.path()],
        ));
        assert!(events[0].is_dir);
    }

    #[tokio::test]
    async fn file_watcher_directory_not_found() {
        let (tx, _rx) = mpsc::channel(10);
        let result = FileWatcher::new(PathBuf::from("/nonexistent/path"), tx);

        assert!(matches!(
            result.unwrap_err(),
            WatcherError::DirectoryNotFound(_)
        ));
    }

    #[tokio::test]
    async fn file_watcher_delivers_file_events() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(100);

        let watcher = FileWatcher::new(dir.path().to_path_buf(), tx).expect("Should create watcher");
        assert_eq!(watcher.watch_dir(), dir.path());

        let file = dir.path().join("touched.txt");
        fs::write(&file, "hello").unwrap();

        let mut saw_file = false;
        while let Ok(Some(event)) = timeout(Duration::from_secs(2), rx.recv()).await {
            if event.path.file_name() == file.file_name() && !event.is_dir {
                saw_file = true;
                break;
            }
        }
        assert!(saw_file, "Should observe an event for the written file");
    }

    #[test]
    fn queue_event_reports_full_and_closed_channels() {
        let (tx, mut rx) = mpsc::channel(1);
        let event = || FsEvent::file(FsEventKind::Modified, "/dev/alpha/a.rs");

        assert!(queue_event(&tx, event()));
        assert!(!queue_event(&tx, event()));
        assert_eq!(rx.try_recv().unwrap(), event());

        rx.close();
        assert!(!queue_event(&tx, event()));
    }

    #[test]
    fn watcher_error_display() {
        let err = WatcherError::DirectoryNotFound(PathBuf::from("/test/path"));
        assert_eq!(err.to_string(), "watch directory does not exist: /test/path");
    }
}
