//! The watch loop: file events in, activity records out.
//!
//! [`EventWatchLoop`] is the single consumer of the [`FsEvent`] channel fed by
//! [`crate::watcher::FileWatcher`]. For each event it runs, in order:
//!
//! 1. skip directory events
//! 2. skip noise (ignored segments, the tool's own output files)
//! 3. classify to a project; skip if not applicable or globally ignored
//! 4. consult the debouncer; skip if within the cooldown
//! 5. append a record stamped with the accepted instant
//!
//! A skipped event is dropped for good. Because one task owns the debouncer,
//! two events for the same project can never both be accepted inside one
//! window, however the watcher threads deliver them.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::classify::{Classification, PathClassifier};
use crate::debounce::{ActivityDebouncer, Clock, SystemClock};
use crate::error::Result;
use crate::recorder::{ActivityRecorder, RecorderError};
use crate::types::{ActivityRecord, ProjectKey};
use crate::watcher::FsEvent;

/// What the loop did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A record was appended.
    Recorded(ActivityRecord),
    /// The event concerned a directory.
    Directory,
    /// The path is noise or one of the tool's own outputs.
    Noise,
    /// The path is outside the root, is the root, or no longer resolves.
    NotApplicable,
    /// The project is globally ignored.
    IgnoredProject(ProjectKey),
    /// The project is within its cooldown window.
    Debounced(ProjectKey),
}

/// Counters over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Events received from the watcher.
    pub events: u64,
    /// Events that produced a log record.
    pub recorded: u64,
    /// Directory-level events.
    pub directories: u64,
    /// Events under ignored segments or on the tool's own outputs.
    pub noise: u64,
    /// Events outside the root, on the root, or on vanished paths.
    pub not_applicable: u64,
    /// Events in globally ignored projects.
    pub ignored_projects: u64,
    /// Events rejected by the cooldown.
    pub debounced: u64,
}

impl WatchStats {
    fn note(&mut self, outcome: &EventOutcome) {
        self.events += 1;
        let counter = match outcome {
            EventOutcome::Recorded(_) => &mut self.recorded,
            EventOutcome::Directory => &mut self.directories,
            EventOutcome::Noise => &mut self.noise,
            EventOutcome::NotApplicable => &mut self.not_applicable,
            EventOutcome::IgnoredProject(_) => &mut self.ignored_projects,
            EventOutcome::Debounced(_) => &mut self.debounced,
        };
        *counter += 1;
    }
}

/// Turns file events into debounced activity records.
#[derive(Debug)]
pub struct EventWatchLoop<C: Clock = SystemClock> {
    classifier: PathClassifier,
    debouncer: ActivityDebouncer<C>,
    recorder: ActivityRecorder,
    stats: WatchStats,
}

impl EventWatchLoop<SystemClock> {
    /// Creates a loop using the wall clock and the given cooldown.
    #[must_use]
    pub fn new(
        classifier: PathClassifier,
        recorder: ActivityRecorder,
        cooldown: Duration,
    ) -> Self {
        Self::with_debouncer(classifier, ActivityDebouncer::new(cooldown), recorder)
    }
}

impl<C: Clock> EventWatchLoop<C> {
    /// Creates a loop around an existing debouncer.
    #[must_use]
    pub fn with_debouncer(
        classifier: PathClassifier,
        debouncer: ActivityDebouncer<C>,
        recorder: ActivityRecorder,
    ) -> Self {
        Self {
            classifier,
            debouncer,
            recorder,
            stats: WatchStats::default(),
        }
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    /// Processes a single event.
    ///
    /// # Errors
    ///
    /// Returns `RecorderError` if an accepted event could not be appended.
    pub fn process(
        &mut self,
        event: &FsEvent,
    ) -> std::result::Result<EventOutcome, RecorderError> {
        let outcome = self.decide(event)?;

        match &outcome {
            EventOutcome::Recorded(_) => {}
            other => trace!(path = %event.path.display(), outcome = ?other, "Skipped event"),
        }

        self.stats.note(&outcome);
        Ok(outcome)
    }

    fn decide(&mut self, event: &FsEvent) -> std::result::Result<EventOutcome, RecorderError> {
        if event.is_dir {
            return Ok(EventOutcome::Directory);
        }

        let project = match self.classifier.project_for(&event.path) {
            Classification::Project(project) => project,
            Classification::Noise => return Ok(EventOutcome::Noise),
            Classification::NotApplicable => return Ok(EventOutcome::NotApplicable),
            Classification::IgnoredProject(project) => {
                return Ok(EventOutcome::IgnoredProject(project))
            }
        };

        let Some(now) = self.debouncer.accept(&project) else {
            return Ok(EventOutcome::Debounced(project));
        };

        let record = self.recorder.append(&project, now)?;
        Ok(EventOutcome::Recorded(record))
    }

    /// Consumes events until `shutdown` completes or the channel closes.
    ///
    /// The shutdown future is polled before the channel on every iteration,
    /// so no event is processed once it has fired. Events still queued at
    /// that point are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if appending to the log fails; the loop stops there.
    pub async fn run<F>(
        mut self,
        mut receiver: mpsc::Receiver<FsEvent>,
        shutdown: F,
    ) -> Result<WatchStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            root = %self.classifier.root().display(),
            log = %self.recorder.path().display(),
            cooldown_secs = self.debouncer.cooldown().num_seconds(),
            "Watch loop started"
        );

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                event = receiver.recv() => match event {
                    Some(event) => {
                        self.process(&event)?;
                    }
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                }
            }
        }

        receiver.close();

        info!(
            events = self.stats.events,
            recorded = self.stats.recorded,
            debounced = self.stats.debounced,
            "Watch loop stopped"
        );

        Ok(self.stats)
    }
}
