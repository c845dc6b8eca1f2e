//! Lifecycle hooks invoked by the tick driver.
//!
//! Every method has a no-op default, so implementors override only the
//! points they care about.

use crate::runtime::Runtime;

/// Returned by the tap hooks to let a postponed cycle run or skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tap {
    /// Run the cycle.
    #[default]
    Proceed,
    /// Skip the rest of this cycle and keep the throttle count.
    Postpone,
}

/// Callbacks around each tick.
pub trait Hooks {
    /// A call was throttled. `transpired` is the fraction of the minimum
    /// interval that has elapsed since the last full cycle.
    fn on_throttled(&mut self, _rt: &mut Runtime, _transpired: f64) {}

    /// The previous call was throttled exactly once.
    fn on_single_tap(&mut self, _rt: &mut Runtime) -> Tap {
        Tap::Proceed
    }

    /// The previous calls were throttled two or more times in a row.
    fn on_double_tap(&mut self, _rt: &mut Runtime) -> Tap {
        Tap::Proceed
    }

    /// A full cycle is about to run.
    fn on_cycle_start(&mut self, _rt: &mut Runtime) {}

    /// A full cycle has finished.
    fn on_cycle_complete(&mut self, _rt: &mut Runtime) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}
