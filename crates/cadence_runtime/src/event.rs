//! Predicate-gated recurring callbacks.
//!
//! An [`Event`] is re-evaluated once per full cycle. While its predicate is
//! false nothing happens and the event stays registered. When the predicate
//! holds, the action runs and its return value decides whether the event
//! keeps watching (`true`) or is dropped (`false`).

use std::fmt;

use cadence_entity::Entity;
use tracing::warn;

use crate::error::RuntimeError;
use crate::runtime::Runtime;

type EventPredicate = Box<dyn FnMut(&Runtime) -> bool>;
type EventAction = Box<dyn FnMut(&mut Runtime) -> Result<bool, RuntimeError>>;

/// A predicate and action pair evaluated every cycle.
pub struct Event {
    predicate: EventPredicate,
    action: EventAction,
    active: bool,
}

impl Event {
    /// Create an event over the runtime context.
    pub fn new<P, A>(predicate: P, action: A) -> Self
    where
        P: FnMut(&Runtime) -> bool + 'static,
        A: FnMut(&mut Runtime) -> Result<bool, RuntimeError> + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            action: Box::new(action),
            active: false,
        }
    }

    /// Create an event whose predicate and action see one entity.
    pub fn on_entity<P, A>(entity: Entity, mut predicate: P, mut action: A) -> Self
    where
        P: FnMut(&Entity) -> bool + 'static,
        A: FnMut(&Entity, &mut Runtime) -> Result<bool, RuntimeError> + 'static,
    {
        let watched = entity.clone();
        Self::new(
            move |_| predicate(&watched),
            move |rt| action(&entity, rt),
        )
    }

    /// Whether the predicate held on the most recent evaluation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Evaluate once. Returns `true` if the event should stay registered.
    ///
    /// An action error is recorded on the runtime and the event is kept, so
    /// the next cycle evaluates it afresh.
    pub fn handle(&mut self, rt: &mut Runtime) -> bool {
        self.active = (self.predicate)(rt);
        if !self.active {
            return true;
        }
        match (self.action)(rt) {
            Ok(keep) => keep,
            Err(e) => {
                warn!(error = %e, "event action failed");
                rt.record_error(e);
                true
            }
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
