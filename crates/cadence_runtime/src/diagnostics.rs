//! Point-in-time runtime report.

use std::fmt;

use cadence_entity::EntityId;
use serde::Serialize;

use crate::clock::ClockState;

/// A snapshot of scheduler state, returned by
/// [`Runtime::diagnostics`](crate::Runtime::diagnostics).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// The owning entity.
    pub owner: EntityId,
    /// Clock state as of the last full cycle.
    pub clock: ClockState,
    /// Full cycles run since construction.
    pub cycles: u64,
    /// Consecutive throttled calls since the last full cycle.
    pub throttled: u32,
    /// Registered events.
    pub events: usize,
    /// Events whose predicate held on their last evaluation.
    pub active_events: usize,
    /// Repeating intervals.
    pub intervals: usize,
    /// Pending one-shot schedule entries.
    pub scheduled: usize,
    /// Earliest pending interval or schedule fire time.
    pub next_fire_time: Option<u64>,
    /// Arguments with registered command callbacks, sorted.
    pub commands: Vec<String>,
    /// Entities in the last refresh.
    pub entities: usize,
    /// Errors recorded during the most recent tick.
    pub errors: Vec<String>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "owner:     {}", self.owner)?;
        writeln!(
            f,
            "clock:     {} (start {}, elapsed {}, delta {})",
            self.clock.clock,
            self.clock.start,
            self.clock.elapsed(),
            self.clock.delta
        )?;
        writeln!(f, "cycles:    {} ({} throttled)", self.cycles, self.throttled)?;
        writeln!(f, "events:    {} ({} active)", self.events, self.active_events)?;
        writeln!(f, "intervals: {}", self.intervals)?;
        match self.next_fire_time {
            Some(at) => writeln!(f, "scheduled: {} (next at {at})", self.scheduled)?,
            None => writeln!(f, "scheduled: {}", self.scheduled)?,
        }
        writeln!(f, "commands:  [{}]", self.commands.join(", "))?;
        write!(f, "entities:  {}", self.entities)?;
        for error in &self.errors {
            write!(f, "\nerror:     {error}")?;
        }
        Ok(())
    }
}
