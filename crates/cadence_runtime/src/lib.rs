//! # cadence_runtime
//!
//! A cooperative, single-threaded scheduler driven by repeated external
//! calls.
//!
//! The host invokes [`Runtime::tick`] whenever it likes. Each call runs any
//! command callbacks for its argument, then, unless throttled, one full
//! cycle of events, repeating intervals and one-shot schedule entries.
//! Actions are plain closures over `&mut Runtime`; they register more work,
//! query entities and send messages through it.
//!
//! ## Usage
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use cadence_entity::{CapabilitySet, MemoryHost};
//! use cadence_runtime::{ManualClock, Runtime, RuntimeConfig};
//!
//! let host = Rc::new(MemoryHost::new());
//! let owner = host.spawn("Control", "ProgrammableBlock", CapabilitySet::empty());
//! let clock = ManualClock::starting_at(0);
//! let mut rt = Runtime::new(host, RuntimeConfig::new(owner), clock.clone());
//!
//! rt.every(1_000, |rt| {
//!     let lights = rt.entities().with_type(cadence_entity::Operator::Equal, "Light")?;
//!     lights.toggle();
//!     Ok(())
//! });
//!
//! clock.set(1_000);
//! rt.tick(0, "");
//! ```

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod hooks;
pub mod runtime;
pub mod schedule;

pub use clock::{ClockState, ManualClock, MonotonicClock, TimeSource};
pub use config::RuntimeConfig;
pub use diagnostics::Diagnostics;
pub use error::{ActionResult, RuntimeError};
pub use event::Event;
pub use hooks::{Hooks, NoHooks, Tap};
pub use runtime::{Runtime, TickOutcome};
pub use schedule::{Action, ScheduledAction, Timeline};
