//! Time sources and the scheduler's clock state.
//!
//! All times are whole milliseconds ("ticks" of the host clock). The runtime
//! reads the current time from a [`TimeSource`] once per call and records
//! the last completed cycle in a [`ClockState`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use serde::Serialize;

/// Supplies the current time in milliseconds.
pub trait TimeSource {
    /// The current time. Must never go backwards.
    fn now(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    #[must_use]
    pub fn starting_at(start: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    /// Move forward by `by` milliseconds.
    pub fn advance(&self, by: u64) {
        self.now.set(self.now.get() + by);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

/// The scheduler's view of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockState {
    /// Time of the last reset.
    pub start: u64,
    /// Time of the last completed full cycle.
    pub clock: u64,
    /// `clock` minus the previous cycle's `clock`.
    pub delta: u64,
}

impl ClockState {
    /// A clock that starts, and has last run, at `now`.
    #[must_use]
    pub const fn new(now: u64) -> Self {
        Self {
            start: now,
            clock: now,
            delta: 0,
        }
    }

    /// Time since the last reset, as of the last cycle.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.clock.saturating_sub(self.start)
    }

    /// Returns `true` once a cycle has run since the last reset.
    #[must_use]
    pub const fn has_run(&self) -> bool {
        self.clock > self.start
    }

    /// Record a completed cycle at `now`.
    pub fn advance(&mut self, now: u64) {
        self.delta = now.saturating_sub(self.clock);
        self.clock = now;
    }

    /// Restart elapsed time from the last cycle.
    pub fn reset(&mut self) {
        self.start = self.clock;
    }
}
