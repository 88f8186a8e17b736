//! Path-to-project classification.
//!
//! A project is the top-level subdirectory of the watched root. Every file
//! event path is first screened for noise (version-control internals,
//! dependency caches, build output, editor metadata, and the tool's own
//! output artifacts), then resolved to the project it belongs to.
//!
//! # Directory Structure
//!
//! ```text
//! ~/dev/                      <- watched root
//! +-- alpha/                  <- project "alpha"
//! |   +-- src/main.rs
//! |   +-- node_modules/x.js   <- noise
//! +-- beta/
//!     +-- README.md           <- project "beta"
//! ```
//!
//! Resolution failures (a path that no longer exists, a path outside the
//! root) are ordinary outcomes, reported as `None`, never as errors.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::types::ProjectKey;

/// Path segments whose presence anywhere in a path marks it as noise.
pub const IGNORED_PATH_PARTS: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "__pycache__",
    ".cursor",
    ".idea",
    "dist",
    "build",
    ".next",
    ".turbo",
    ".cache",
    "vendor",
    ".DS_Store",
];

/// Projects that are never recorded (this tool's own folder).
pub const IGNORED_PROJECTS: &[&str] = &["dev-activity"];

/// Resolves `event_path` to the project directory it belongs to under `root`.
///
/// Both paths are canonicalized (absolute, symlinks followed). Returns `None`
/// when either cannot be resolved, when the path lies outside `root`, or when
/// it is `root` itself.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use dev_activity::classify::classify;
///
/// let project = classify(Path::new("/home/me/dev"), Path::new("/home/me/dev/alpha/src/lib.rs"));
/// assert_eq!(project.as_deref(), Some("alpha"));
/// ```
#[must_use]
pub fn classify(root: &Path, event_path: &Path) -> Option<ProjectKey> {
    let root = fs::canonicalize(root).ok()?;
    classify_resolved(&root, event_path)
}

/// Same as [`classify`], with `root` already canonicalized.
fn classify_resolved(root: &Path, event_path: &Path) -> Option<ProjectKey> {
    let full = fs::canonicalize(event_path).ok()?;
    let relative = full.strip_prefix(root).ok()?;

    match relative.components().next()? {
        Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
        _ => None,
    }
}

/// Returns `true` if events for `path` must never be recorded.
///
/// A path is noise when it is one of `excluded_outputs` (compared after
/// resolution) or when any of its segments is in [`IGNORED_PATH_PARTS`].
/// Segments are checked on the path as given and, when it still exists, on
/// its resolved form.
#[must_use]
pub fn is_noise(path: &Path, excluded_outputs: &[PathBuf]) -> bool {
    if has_ignored_segment(path) {
        return true;
    }

    let Ok(resolved) = fs::canonicalize(path) else {
        return false;
    };

    if excluded_outputs
        .iter()
        .any(|out| fs::canonicalize(out).is_ok_and(|out| out == resolved))
    {
        return true;
    }

    has_ignored_segment(&resolved)
}

/// Returns `true` if `project` is in the globally ignored set.
#[must_use]
pub fn is_ignored_project(project: &str) -> bool {
    IGNORED_PROJECTS.contains(&project)
}

fn has_ignored_segment(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(segment) => is_ignored_segment(segment),
        _ => false,
    })
}

fn is_ignored_segment(segment: &OsStr) -> bool {
    segment
        .to_str()
        .is_some_and(|s| IGNORED_PATH_PARTS.contains(&s))
}

/// Classifier bound to one watched root and one set of output artifacts.
///
/// The root is canonicalized once at construction; each call to
/// [`PathClassifier::project_for`] only resolves the event path.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    root: PathBuf,
    excluded_outputs: Vec<PathBuf>,
    ignored_projects: HashSet<String>,
}

/// Why a path did or did not yield a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The path belongs to this project.
    Project(ProjectKey),
    /// The path is noise or one of the tool's own outputs.
    Noise,
    /// The path is outside the root, is the root, or no longer resolves.
    NotApplicable,
    /// The path belongs to a project that is never recorded.
    IgnoredProject(ProjectKey),
}

impl PathClassifier {
    /// Creates a classifier for `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` cannot be canonicalized.
    pub fn new(root: &Path, excluded_outputs: Vec<PathBuf>) -> std::io::Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
            excluded_outputs,
            ignored_projects: IGNORED_PROJECTS.iter().map(|p| (*p).to_string()).collect(),
        })
    }

    /// Returns the canonical watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the output artifacts excluded from recording.
    #[must_use]
    pub fn excluded_outputs(&self) -> &[PathBuf] {
        &self.excluded_outputs
    }

    /// Applies the noise check, project resolution and ignored-project check
    /// in that order.
    #[must_use]
    pub fn project_for(&self, path: &Path) -> Classification {
        if is_noise(path, &self.excluded_outputs) {
            return Classification::Noise;
        }

        match classify_resolved(&self.root, path) {
            None => Classification::NotApplicable,
            Some(project) if self.ignored_projects.contains(&project) => {
                Classification::IgnoredProject(project)
            }
            Some(project) => Classification::Project(project),
        }
    }
}
