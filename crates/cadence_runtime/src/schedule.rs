//! Timed actions: one-shot schedule entries and repeating intervals.
//!
//! A [`Timeline`] holds [`ScheduledAction`]s keyed by absolute fire time.
//! The runtime takes the due entries out of a timeline, runs them, and puts
//! repeating ones back with their next fire time.

use std::fmt;

use crate::error::ActionResult;
use crate::runtime::Runtime;

/// A boxed action run against the runtime.
pub type Action = Box<dyn FnMut(&mut Runtime) -> ActionResult>;

/// A callback bound to an absolute fire time.
pub struct ScheduledAction {
    /// When the action is next due.
    pub fire_time: u64,
    /// Repeat period; `0` means one-shot.
    pub period: u64,
    pub(crate) action: Action,
}

impl ScheduledAction {
    /// An action that fires once at `fire_time`.
    #[must_use]
    pub fn once(fire_time: u64, action: Action) -> Self {
        Self {
            fire_time,
            period: 0,
            action,
        }
    }

    /// An action that first fires at `fire_time` and then every `period`.
    #[must_use]
    pub fn repeating(fire_time: u64, period: u64, action: Action) -> Self {
        Self {
            fire_time,
            period,
            action,
        }
    }

    /// Returns `true` if the action should fire at `clock`.
    #[must_use]
    pub fn is_due(&self, clock: u64) -> bool {
        self.fire_time <= clock
    }

    /// Returns `true` for repeating actions.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.period > 0
    }

    /// Compute the next fire time after firing at `now`.
    ///
    /// The overrun `now - fire_time` is subtracted from the period, so the
    /// next target stays on the registration grid instead of slipping by the
    /// overrun every cycle. Returns `false` for one-shot actions, which must
    /// be dropped.
    pub fn rearm(&mut self, now: u64) -> bool {
        if !self.is_repeating() {
            return false;
        }
        let drift = now.saturating_sub(self.fire_time);
        self.fire_time = now + self.period - drift;
        true
    }
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledAction")
            .field("fire_time", &self.fire_time)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// An ordered set of scheduled actions.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<ScheduledAction>,
}

impl Timeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry after all existing ones.
    pub fn push(&mut self, entry: ScheduledAction) {
        self.entries.push(entry);
    }

    /// Remove and return every entry due at `clock`, in insertion order.
    pub fn take_due(&mut self, clock: u64) -> Vec<ScheduledAction> {
        let (due, pending) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.is_due(clock));
        self.entries = pending;
        due
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The earliest pending fire time.
    #[must_use]
    pub fn next_fire_time(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.fire_time).min()
    }

    /// Fire times in insertion order.
    #[must_use]
    pub fn fire_times(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.fire_time).collect()
    }
}
