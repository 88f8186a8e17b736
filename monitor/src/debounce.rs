//! Per-project cooldown debouncing.
//!
//! Editors and build tools touch many files in quick bursts. The debouncer
//! turns such a burst into a single occurrence per project: the first event
//! for a project is accepted, and every further event for that project is
//! rejected until the cooldown window has elapsed since the last accepted one.
//!
//! ```text
//! time   0s    40s   90s   299s  300s  310s
//! alpha  ACC   rej   rej   rej   ACC   rej
//! beta               ACC               rej
//! ```
//!
//! The window is keyed by project only, so activity across different files of
//! the same project collapses into one record. State lives in memory for the
//! lifetime of one watch loop; a restart starts every window afresh.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chrono::{Local, TimeZone};
//! use dev_activity::debounce::ActivityDebouncer;
//!
//! let mut debouncer = ActivityDebouncer::new(Duration::from_secs(300));
//! let t0 = Local.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
//!
//! assert!(debouncer.should_record("alpha", t0));
//! assert!(!debouncer.should_record("alpha", t0 + chrono::Duration::seconds(60)));
//! assert!(debouncer.should_record("alpha", t0 + chrono::Duration::seconds(300)));
//! ```

use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use tracing::trace;

use crate::types::ProjectKey;

/// Default cooldown between two records of the same project.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Source of the current local time.
pub trait Clock: Send {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Test builds only.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the component under test.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

#[cfg(test)]
impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }

    /// Sets the clock to `at`.
    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decides whether an occurrence for a project should be recorded.
///
/// # Thread Safety
///
/// `should_record` takes `&mut self`: the accept-then-update step is atomic
/// because only one owner can call it at a time. The watch loop owns the
/// debouncer and is the single consumer of the event channel.
#[derive(Debug)]
pub struct ActivityDebouncer<C: Clock = SystemClock> {
    cooldown: TimeDelta,
    last_seen: HashMap<ProjectKey, DateTime<Local>>,
    clock: C,
}

impl ActivityDebouncer<SystemClock> {
    /// Creates a debouncer using the wall clock.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, SystemClock)
    }
}

impl<C: Clock> ActivityDebouncer<C> {
    /// Creates a debouncer that reads time from `clock`.
    #[must_use]
    pub fn with_clock(cooldown: Duration, clock: C) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
            last_seen: HashMap::new(),
            clock,
        }
    }

    /// Returns the configured cooldown.
    #[must_use]
    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Returns `true` and remembers `now` if `project` is outside its cooldown.
    ///
    /// The last-seen time is only updated on acceptance, so a steady stream of
    /// rejected events never extends the window.
    pub fn should_record(&mut self, project: &str, now: DateTime<Local>) -> bool {
        if let Some(last) = self.last_seen.get(project) {
            let elapsed = now.signed_duration_since(*last);
            if elapsed < self.cooldown {
                trace!(
                    project = %project,
                    elapsed_secs = elapsed.num_seconds(),
                    "Within cooldown, rejecting"
                );
                return false;
            }
        }

        self.last_seen.insert(project.to_string(), now);
        true
    }

    /// Checks `project` against the clock's current time.
    ///
    /// Returns the accepted instant, or `None` if the event was rejected.
    pub fn accept(&mut self, project: &str) -> Option<DateTime<Local>> {
        let now = self.clock.now();
        self.should_record(project, now).then_some(now)
    }

    /// Returns the last accepted instant for `project`.
    #[must_use]
    pub fn last_seen(&self, project: &str) -> Option<DateTime<Local>> {
        self.last_seen.get(project).copied()
    }

    /// Returns the number of projects with a remembered acceptance.
    #[must_use]
    pub fn tracked_projects(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()
    }

    fn secs(s: i64) -> TimeDelta {
        TimeDelta::seconds(s)
    }

    #[test]
    fn first_event_is_accepted() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        assert_eq!(debouncer.last_seen("alpha"), Some(t0()));
    }

    #[test]
    fn event_within_cooldown_is_rejected() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        assert!(!debouncer.should_record("alpha", t0() + secs(1)));
        assert!(!debouncer.should_record("alpha", t0() + secs(299)));
    }

    #[test]
    fn event_at_exact_cooldown_is_accepted() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        assert!(debouncer.should_record("alpha", t0() + secs(300)));
        assert_eq!(debouncer.last_seen("alpha"), Some(t0() + secs(300)));
    }

    #[test]
    fn rejected_events_do_not_extend_window() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        for s in (10..300).step_by(10) {
            assert!(!debouncer.should_record("alpha", t0() + secs(s)));
        }
        assert!(debouncer.should_record("alpha", t0() + secs(300)));
    }

    #[test]
    fn projects_are_independent() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        assert!(debouncer.should_record("beta", t0() + secs(1)));
        assert!(!debouncer.should_record("alpha", t0() + secs(2)));
        assert!(!debouncer.should_record("beta", t0() + secs(3)));
        assert_eq!(debouncer.tracked_projects(), 2);
    }

    #[test]
    fn clock_going_backwards_is_rejected() {
        let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
        assert!(debouncer.should_record("alpha", t0()));
        assert!(!debouncer.should_record("alpha", t0() - secs(3600)));
    }

    #[test]
    fn accept_reads_injected_clock() {
        let clock = ManualClock::new(t0());
        let mut debouncer = ActivityDebouncer::with_clock(Duration::from_secs(60), clock.clone());

        assert_eq!(debouncer.accept("alpha"), Some(t0()));

        clock.advance(Duration::from_secs(59));
        assert_eq!(debouncer.accept("alpha"), None);

        clock.advance(Duration::from_secs(1));
        assert_eq!(debouncer.accept("alpha"), Some(t0() + secs(60)));
    }

    #[test]
    fn manual_clock_set_moves_shared_instant() {
        let clock = ManualClock::new(t0());
        let handle = clock.clone();
        handle.set(t0() + secs(42));
        assert_eq!(clock.now(), t0() + secs(42));
    }

    #[test]
    fn zero_cooldown_accepts_everything() {
        let mut debouncer = ActivityDebouncer::new(Duration::ZERO);
        assert!(debouncer.should_record("alpha", t0()));
        assert!(debouncer.should_record("alpha", t0()));
    }

    #[test]
    fn cooldown_property_holds_for_all_gaps() {
        for gap in [0_i64, 1, 150, 299, 300, 301, 3600] {
            let mut debouncer = ActivityDebouncer::new(DEFAULT_COOLDOWN);
            assert!(debouncer.should_record("p", t0()));
            let second = debouncer.should_record("p", t0() + secs(gap));
            assert_eq!(second, gap >= 300, "gap of {gap}s");
        }
    }
}
