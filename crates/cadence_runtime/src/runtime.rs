//! The tick driver.
//!
//! The host calls [`Runtime::tick`] once per frame or poll. Each call runs,
//! in this fixed order:
//!
//! 1. Command callbacks registered for the call's argument (always).
//! 2. The throttle check. Calls closer together than `min_interval` stop
//!    here after reporting progress to [`Hooks::on_throttled`].
//! 3. The single/double-tap hook if the previous call was throttled. Either
//!    may postpone the cycle.
//! 4. [`Hooks::on_cycle_start`], then the clock update.
//! 5. Events, then repeating intervals, then one-shot schedule entries.
//! 6. [`Hooks::on_cycle_complete`].
//!
//! Intervals rearm before schedule entries fire, so a schedule entry an
//! interval adds during step 5 is seen in the same cycle without racing it.

use std::collections::HashMap;
use std::rc::Rc;

use cadence_entity::{Entity, EntityCollection, Host};
use cadence_mail::{Message, mailbox};
use tracing::{debug, info, trace, warn};

use crate::clock::{ClockState, TimeSource};
use crate::config::RuntimeConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ActionResult, RuntimeError};
use crate::event::Event;
use crate::hooks::{Hooks, Tap};
use crate::schedule::{Action, ScheduledAction, Timeline};

/// What a single [`Runtime::tick`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A full cycle ran.
    Ran,
    /// The call came too soon; `transpired` is the elapsed fraction of the
    /// minimum interval.
    Throttled {
        /// Elapsed fraction of the minimum interval, in `[0, 1)`.
        transpired: f64,
    },
    /// A tap hook postponed the cycle.
    Postponed,
}

/// The cooperative scheduler and its context.
pub struct Runtime {
    host: Rc<dyn Host>,
    config: RuntimeConfig,
    time: Box<dyn TimeSource>,
    clock: ClockState,
    owner: Entity,
    entities: EntityCollection,
    commands: HashMap<String, Vec<Action>>,
    events: Vec<Event>,
    intervals: Timeline,
    schedule: Timeline,
    hooks: Option<Box<dyn Hooks>>,
    /// Consecutive throttled calls since the last full cycle.
    throttled: u32,
    cycles: u64,
    errors: Vec<RuntimeError>,
}

impl Runtime {
    /// Create a runtime over `host`, reading time from `time`.
    ///
    /// The clock starts at the time source's current reading and the entity
    /// set is enumerated once.
    pub fn new(host: Rc<dyn Host>, config: RuntimeConfig, time: impl TimeSource + 'static) -> Self {
        let now = time.now();
        let owner = Entity::new(config.owner, host.clone());
        let mut runtime = Self {
            host,
            config,
            time: Box::new(time),
            clock: ClockState::new(now),
            owner,
            entities: EntityCollection::new(),
            commands: HashMap::new(),
            events: Vec::new(),
            intervals: Timeline::new(),
            schedule: Timeline::new(),
            hooks: None,
            throttled: 0,
            cycles: 0,
            errors: Vec::new(),
        };
        runtime.refresh();
        runtime
    }

    /// Install lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Replace the lifecycle hooks.
    pub fn set_hooks(&mut self, hooks: Box<dyn Hooks>) {
        self.hooks = Some(hooks);
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// The host environment.
    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Clock state as of the last full cycle.
    #[must_use]
    pub fn clock(&self) -> ClockState {
        self.clock
    }

    /// The entity that owns this runtime's mailbox.
    #[must_use]
    pub fn owner(&self) -> &Entity {
        &self.owner
    }

    /// Entities as of the last refresh.
    #[must_use]
    pub fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    /// Errors recorded by actions during the most recent tick.
    #[must_use]
    pub fn last_errors(&self) -> &[RuntimeError] {
        &self.errors
    }

    pub(crate) fn record_error(&mut self, error: RuntimeError) {
        self.errors.push(error);
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Run `callback` on every tick called with `argument`, throttled or not.
    /// Callbacks for one argument run in registration order.
    pub fn on<F>(&mut self, argument: impl Into<String>, callback: F)
    where
        F: FnMut(&mut Runtime) -> ActionResult + 'static,
    {
        self.commands
            .entry(argument.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Run `callback` once, at `time` milliseconds after the last reset.
    pub fn at<F>(&mut self, time: u64, callback: F)
    where
        F: FnMut(&mut Runtime) -> ActionResult + 'static,
    {
        let fire_time = self.clock.start + time;
        self.schedule
            .push(ScheduledAction::once(fire_time, Box::new(callback)));
    }

    /// Run `callback` once, `delay` milliseconds after the last cycle.
    pub fn after<F>(&mut self, delay: u64, callback: F)
    where
        F: FnMut(&mut Runtime) -> ActionResult + 'static,
    {
        self.at(self.clock.elapsed() + delay, callback);
    }

    /// Run `callback` every `period` milliseconds, first one period after
    /// the last cycle. A zero period fires once.
    pub fn every<F>(&mut self, period: u64, callback: F)
    where
        F: FnMut(&mut Runtime) -> ActionResult + 'static,
    {
        let fire_time = self.clock.clock + period;
        self.intervals
            .push(ScheduledAction::repeating(fire_time, period, Box::new(callback)));
    }

    /// Register an event.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Register an event over the runtime context.
    pub fn when<P, A>(&mut self, predicate: P, action: A)
    where
        P: FnMut(&Runtime) -> bool + 'static,
        A: FnMut(&mut Runtime) -> Result<bool, RuntimeError> + 'static,
    {
        self.add_event(Event::new(predicate, action));
    }

    /// Register one independent event per member of `entities`, all sharing
    /// the same predicate and action.
    pub fn when_each<P, A>(&mut self, entities: &EntityCollection, predicate: P, action: A)
    where
        P: Fn(&Entity) -> bool + 'static,
        A: Fn(&Entity, &mut Runtime) -> Result<bool, RuntimeError> + 'static,
    {
        let predicate = Rc::new(predicate);
        let action = Rc::new(action);
        for entity in entities {
            let predicate = Rc::clone(&predicate);
            let action = Rc::clone(&action);
            self.add_event(Event::on_entity(
                entity.clone(),
                move |e| predicate(e),
                move |e, rt| action(e, rt),
            ));
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Re-enumerate entities from the host.
    pub fn refresh(&mut self) {
        self.entities = EntityCollection::from_host(self.host.clone());
        info!(entities = self.entities.len(), "refreshed entities");
    }

    /// Restart elapsed time from the last cycle, empty the owner's mailbox
    /// and, if configured, refresh the entity set.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Mail`] if the owner's name cannot be
    /// rewritten. The clock and entity set are reset regardless.
    pub fn reset(&mut self) -> Result<(), RuntimeError> {
        self.clock.reset();
        // An unset owner has no mailbox to clear.
        let cleared = if self.owner.id().is_valid() {
            mailbox::clear(&self.owner)
        } else {
            Ok(())
        };
        if self.config.refresh_on_reset {
            self.refresh();
        }
        info!(start = self.clock.start, "runtime reset");
        Ok(cleared?)
    }

    /// Tick with the configured minimum interval.
    pub fn tick_default(&mut self, argument: &str) -> TickOutcome {
        self.tick(self.config.min_interval_ms, argument)
    }

    /// Run one tick. See the module docs for the order of operations.
    pub fn tick(&mut self, min_interval: u64, argument: &str) -> TickOutcome {
        self.errors.clear();
        self.run_commands(argument);

        let now = self.time.now();
        let since = now.saturating_sub(self.clock.clock);
        if self.clock.has_run() && since < min_interval {
            self.throttled += 1;
            let transpired = since as f64 / min_interval as f64;
            trace!(throttled = self.throttled, transpired, "tick throttled");
            self.call_hooks((), |hooks, rt| hooks.on_throttled(rt, transpired));
            return TickOutcome::Throttled { transpired };
        }

        let tap = match self.throttled {
            0 => Tap::Proceed,
            1 => self.call_hooks(Tap::Proceed, |hooks, rt| hooks.on_single_tap(rt)),
            _ => self.call_hooks(Tap::Proceed, |hooks, rt| hooks.on_double_tap(rt)),
        };
        if tap == Tap::Postpone {
            debug!(throttled = self.throttled, "cycle postponed");
            return TickOutcome::Postponed;
        }

        self.throttled = 0;
        self.call_hooks((), |hooks, rt| hooks.on_cycle_start(rt));
        self.clock.advance(now);
        debug!(
            cycle = self.cycles,
            clock = self.clock.clock,
            delta = self.clock.delta,
            events = self.events.len(),
            intervals = self.intervals.len(),
            scheduled = self.schedule.len(),
            "cycle start"
        );

        self.fire_events();
        self.fire_intervals();
        self.fire_schedule();

        self.call_hooks((), |hooks, rt| hooks.on_cycle_complete(rt));
        self.cycles += 1;
        TickOutcome::Ran
    }

    fn call_hooks<R>(&mut self, default: R, f: impl FnOnce(&mut dyn Hooks, &mut Runtime) -> R) -> R {
        let Some(mut hooks) = self.hooks.take() else {
            return default;
        };
        let result = f(hooks.as_mut(), self);
        // A hook may have installed replacements; those win.
        if self.hooks.is_none() {
            self.hooks = Some(hooks);
        }
        result
    }

    fn run_action(&mut self, what: &'static str, action: &mut Action) {
        if let Err(e) = action(self) {
            warn!(kind = what, error = %e, "action failed");
            self.errors.push(e);
        }
    }

    fn run_commands(&mut self, argument: &str) {
        let Some(mut callbacks) = self.commands.remove(argument) else {
            return;
        };
        debug!(argument, callbacks = callbacks.len(), "running command callbacks");
        for callback in &mut callbacks {
            self.run_action("command", callback);
        }
        // Keep callbacks registered while these ran, after the earlier ones.
        if let Some(added) = self.commands.remove(argument) {
            callbacks.extend(added);
        }
        self.commands.insert(argument.to_string(), callbacks);
    }

    fn fire_events(&mut self) {
        let mut events = std::mem::take(&mut self.events);
        let before = events.len();
        events.retain_mut(|event| event.handle(self));
        if events.len() != before {
            debug!(removed = before - events.len(), "events completed");
        }
        events.append(&mut self.events);
        self.events = events;
    }

    fn fire_intervals(&mut self) {
        let now = self.clock.clock;
        for mut entry in self.intervals.take_due(now) {
            self.run_action("interval", &mut entry.action);
            if entry.rearm(now) {
                trace!(next = entry.fire_time, "interval rearmed");
                self.intervals.push(entry);
            }
        }
    }

    fn fire_schedule(&mut self) {
        for mut entry in self.schedule.take_due(self.clock.clock) {
            trace!(fire_time = entry.fire_time, "schedule entry fired");
            self.run_action("schedule", &mut entry.action);
        }
    }

    // ── Messaging ───────────────────────────────────────────────────────────

    /// Post a message from the owner to `recipient`, stamped with the
    /// current clock.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Mail`] if the recipient cannot be written.
    pub fn send(&self, recipient: &Entity, subject: &str, body: &str) -> Result<(), RuntimeError> {
        let message = Message::new(self.owner.clone(), subject, body, self.clock.clock);
        mailbox::post(recipient, &message)?;
        Ok(())
    }

    /// Consume every message waiting in the owner's mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Mail`] on the first undecodable message.
    pub fn inbox(&self) -> Result<Vec<Message>, RuntimeError> {
        Ok(mailbox::drain(&self.owner)?)
    }

    // ── Diagnostics ─────────────────────────────────────────────────────────

    /// A snapshot of scheduler state.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let mut commands: Vec<String> = self.commands.keys().cloned().collect();
        commands.sort();
        let next_fire_time = [
            self.intervals.next_fire_time(),
            self.schedule.next_fire_time(),
        ]
        .into_iter()
        .flatten()
        .min();

        Diagnostics {
            owner: self.owner.id(),
            clock: self.clock,
            cycles: self.cycles,
            throttled: self.throttled,
            events: self.events.len(),
            active_events: self.events.iter().filter(|e| e.is_active()).count(),
            intervals: self.intervals.len(),
            scheduled: self.schedule.len(),
            next_fire_time,
            commands,
            entities: self.entities.len(),
            errors: self.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use cadence_entity::{CapabilitySet, EntityId, MemoryHost, Operator};

    use super::*;
    use crate::clock::ManualClock;
    use crate::hooks::NoHooks;

    struct Fixture {
        host: Rc<MemoryHost>,
        clock: ManualClock,
        rt: Runtime,
    }

    /// A runtime created at t=0 whose first full cycle ran at t=1000.
    fn fixture() -> Fixture {
        let host = Rc::new(MemoryHost::new());
        let owner = host.spawn("Control", "ProgrammableBlock", CapabilitySet::empty());
        host.spawn("Sensor A", "Sensor", CapabilitySet::empty());
        host.spawn("Sensor B", "Sensor", CapabilitySet::empty());
        let clock = ManualClock::starting_at(0);
        let mut rt = Runtime::new(host.clone(), RuntimeConfig::new(owner), clock.clone());
        clock.set(1_000);
        assert_eq!(rt.tick(0, ""), TickOutcome::Ran);
        Fixture { host, clock, rt }
    }

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[derive(Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        single: Tap,
        double: Tap,
    }

    impl Hooks for Recorder {
        fn on_throttled(&mut self, _rt: &mut Runtime, transpired: f64) {
            self.log.borrow_mut().push(format!("throttled {transpired}"));
        }
        fn on_single_tap(&mut self, _rt: &mut Runtime) -> Tap {
            self.log.borrow_mut().push("single".into());
            self.single
        }
        fn on_double_tap(&mut self, _rt: &mut Runtime) -> Tap {
            self.log.borrow_mut().push("double".into());
            self.double
        }
        fn on_cycle_start(&mut self, _rt: &mut Runtime) {
            self.log.borrow_mut().push("start".into());
        }
        fn on_cycle_complete(&mut self, _rt: &mut Runtime) {
            self.log.borrow_mut().push("complete".into());
        }
    }

    #[test]
    fn test_new_runtime_refreshes_entities() {
        let f = fixture();
        assert_eq!(f.rt.entities().len(), 3);
        assert_eq!(f.rt.owner().name().unwrap(), "Control");
        assert_eq!(f.rt.clock().clock, 1_000);
        assert_eq!(f.rt.clock().delta, 1_000);
    }

    #[test]
    fn test_throttle_reports_fraction_and_skips_cycle() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        f.rt.set_hooks(Box::new(Recorder {
            log: log.clone(),
            ..Recorder::default()
        }));
        let fired = counter();
        let c = fired.clone();
        f.rt.when(|_| true, move |_| {
            c.set(c.get() + 1);
            Ok(true)
        });

        f.clock.set(1_500);
        assert_eq!(f.rt.tick(1_000, ""), TickOutcome::Throttled { transpired: 0.5 });
        assert_eq!(fired.get(), 0);
        assert_eq!(f.rt.clock().clock, 1_000);
        assert_eq!(*log.borrow(), vec!["throttled 0.5".to_string()]);
    }

    #[test]
    fn test_first_call_is_never_throttled() {
        let host = Rc::new(MemoryHost::new());
        let clock = ManualClock::starting_at(0);
        let mut rt = Runtime::new(host, RuntimeConfig::default(), clock.clone());
        clock.set(10);
        assert_eq!(rt.tick(1_000, ""), TickOutcome::Ran);
    }

    #[test]
    fn test_commands_run_even_when_throttled() {
        let mut f = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = order.clone();
            f.rt.on("open", move |_| {
                order.borrow_mut().push(tag);
                Ok(())
            });
        }

        f.clock.set(1_100);
        assert!(matches!(f.rt.tick(1_000, "open"), TickOutcome::Throttled { .. }));
        assert_eq!(*order.borrow(), vec!["first", "second"]);

        // Other arguments do not trigger them.
        f.rt.tick(1_000, "close");
        assert_eq!(order.borrow().len(), 2);
    }

    #[test]
    fn test_single_and_double_tap() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        f.rt.set_hooks(Box::new(Recorder {
            log: log.clone(),
            ..Recorder::default()
        }));

        f.clock.set(1_100);
        f.rt.tick(1_000, "");
        f.clock.set(2_000);
        assert_eq!(f.rt.tick(1_000, ""), TickOutcome::Ran);

        f.clock.set(2_100);
        f.rt.tick(1_000, "");
        f.clock.set(2_200);
        f.rt.tick(1_000, "");
        f.clock.set(3_000);
        assert_eq!(f.rt.tick(1_000, ""), TickOutcome::Ran);

        let log = log.borrow();
        let taps: Vec<&str> = log
            .iter()
            .map(String::as_str)
            .filter(|s| *s == "single" || *s == "double")
            .collect();
        assert_eq!(taps, vec!["single", "double"]);
    }

    #[test]
    fn test_postpone_keeps_throttle_count_and_skips_work() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        f.rt.set_hooks(Box::new(Recorder {
            log: log.clone(),
            single: Tap::Postpone,
            double: Tap::Postpone,
        }));
        let fired = counter();
        let c = fired.clone();
        f.rt.every(100, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        f.clock.set(1_100);
        f.rt.tick(1_000, "");
        f.clock.set(2_500);
        assert_eq!(f.rt.tick(1_000, ""), TickOutcome::Postponed);
        assert_eq!(fired.get(), 0);
        assert_eq!(f.rt.diagnostics().throttled, 1);
        assert!(!log.borrow().iter().any(|s| s == "start"));

        // Still postponed: the count was kept, so the single-tap hook runs again.
        f.clock.set(2_600);
        assert_eq!(f.rt.tick(1_000, ""), TickOutcome::Postponed);
        assert_eq!(log.borrow().iter().filter(|s| *s == "single").count(), 2);
    }

    #[test]
    fn test_cycle_hooks_bracket_work() {
        let mut f = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        f.rt.set_hooks(Box::new(Recorder {
            log: log.clone(),
            ..Recorder::default()
        }));
        let l = log.clone();
        f.rt.when(|_| true, move |_| {
            l.borrow_mut().push("event".into());
            Ok(false)
        });

        f.clock.set(1_500);
        f.rt.tick(0, "");
        assert_eq!(*log.borrow(), vec!["start", "event", "complete"]);
    }

    #[test]
    fn test_events_interval_schedule_order() {
        let mut f = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        f.rt.after(100, move |_| {
            o.borrow_mut().push("schedule");
            Ok(())
        });
        let o = order.clone();
        f.rt.every(100, move |_| {
            o.borrow_mut().push("interval");
            Ok(())
        });
        let o = order.clone();
        f.rt.when(|_| true, move |_| {
            o.borrow_mut().push("event");
            Ok(false)
        });

        f.clock.set(1_100);
        f.rt.tick(0, "");
        assert_eq!(*order.borrow(), vec!["event", "interval", "schedule"]);
    }

    #[test]
    fn test_every_is_drift_compensated() {
        let mut f = fixture();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let log = fired.clone();
        // Registered at T = 1000 with period 500.
        f.rt.every(500, move |rt| {
            log.borrow_mut().push(rt.clock().clock);
            Ok(())
        });

        f.clock.set(1_400);
        f.rt.tick(0, "");
        assert!(fired.borrow().is_empty());

        // Fires late at T + period + 30.
        f.clock.set(1_530);
        f.rt.tick(0, "");
        assert_eq!(*fired.borrow(), vec![1_530]);

        // Next target is T + 2 * period, not 1530 + 500.
        f.clock.set(2_000);
        f.rt.tick(0, "");
        assert_eq!(*fired.borrow(), vec![1_530, 2_000]);
        assert_eq!(f.rt.diagnostics().next_fire_time, Some(2_500));
    }

    #[test]
    fn test_at_fires_once_then_is_removed() {
        let mut f = fixture();
        let fired = counter();
        let c = fired.clone();
        // start = 0, so absolute 1500.
        f.rt.at(1_500, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        assert_eq!(f.rt.diagnostics().scheduled, 1);

        f.clock.set(1_499);
        f.rt.tick(0, "");
        assert_eq!(fired.get(), 0);

        f.clock.set(1_600);
        f.rt.tick(0, "");
        f.clock.set(1_700);
        f.rt.tick(0, "");
        assert_eq!(fired.get(), 1);
        assert_eq!(f.rt.diagnostics().scheduled, 0);
    }

    #[test]
    fn test_at_is_relative_to_reset() {
        let mut f = fixture();
        f.rt.reset().unwrap();
        assert_eq!(f.rt.clock().start, 1_000);

        let fired = counter();
        let c = fired.clone();
        f.rt.at(200, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        assert_eq!(f.rt.diagnostics().next_fire_time, Some(1_200));
    }

    #[test]
    fn test_after_is_relative_to_clock() {
        let mut f = fixture();
        f.rt.after(250, |_| Ok(()));
        assert_eq!(f.rt.diagnostics().next_fire_time, Some(1_250));
    }

    #[test]
    fn test_schedule_added_by_interval_fires_same_cycle() {
        let mut f = fixture();
        let fired = counter();
        let c = fired.clone();
        f.rt.every(100, move |rt| {
            let c = c.clone();
            rt.after(0, move |_| {
                c.set(c.get() + 1);
                Ok(())
            });
            Ok(())
        });

        f.clock.set(1_100);
        f.rt.tick(0, "");
        assert_eq!(fired.get(), 1);
        assert_eq!(f.rt.diagnostics().intervals, 1);
    }

    #[test]
    fn test_event_never_true_is_retained() {
        let mut f = fixture();
        f.rt.when(|_| false, |_| Ok(false));
        for step in 1..=10 {
            f.clock.set(1_000 + step * 100);
            f.rt.tick(0, "");
        }
        let diag = f.rt.diagnostics();
        assert_eq!(diag.events, 1);
        assert_eq!(diag.active_events, 0);
    }

    #[test]
    fn test_event_removed_after_single_firing() {
        let mut f = fixture();
        let fired = counter();
        let c = fired.clone();
        f.rt.when(|_| true, move |_| {
            c.set(c.get() + 1);
            Ok(false)
        });
        for step in 1..=3 {
            f.clock.set(1_000 + step * 100);
            f.rt.tick(0, "");
        }
        assert_eq!(fired.get(), 1);
        assert_eq!(f.rt.diagnostics().events, 0);
    }

    #[test]
    fn test_event_keeps_firing_until_action_declines() {
        let mut f = fixture();
        let fired = counter();
        let c = fired.clone();
        f.rt.when(|_| true, move |_| {
            c.set(c.get() + 1);
            Ok(c.get() < 3)
        });
        for step in 1..=5 {
            f.clock.set(1_000 + step * 100);
            f.rt.tick(0, "");
        }
        assert_eq!(fired.get(), 3);
    }

    #[test]
    fn test_when_each_creates_one_event_per_entity() {
        let mut f = fixture();
        let sensors = f
            .rt
            .entities()
            .with_type(Operator::Equal, "Sensor")
            .unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        f.rt.when_each(
            &sensors,
            |e| e.name().is_ok_and(|n| n.ends_with('A')),
            move |e, _| {
                s.borrow_mut().push(e.id());
                Ok(false)
            },
        );
        assert_eq!(f.rt.diagnostics().events, 2);

        f.clock.set(1_100);
        f.rt.tick(0, "");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(f.rt.diagnostics().events, 1);
    }

    #[test]
    fn test_action_error_is_recorded_for_one_tick() {
        let mut f = fixture();
        f.rt.after(50, |rt| {
            rt.entities()
                .with_name(Operator::Equal, "Reactor")?
                .find_or_fail("no reactor")?;
            Ok(())
        });

        f.clock.set(1_100);
        f.rt.tick(0, "");
        assert_eq!(f.rt.last_errors().len(), 1);
        assert!(f.rt.diagnostics().errors[0].contains("no reactor"));

        f.clock.set(1_200);
        f.rt.tick(0, "");
        assert!(f.rt.last_errors().is_empty());
    }

    #[test]
    fn test_failing_interval_is_still_rearmed() {
        let mut f = fixture();
        f.rt.every(100, |_| Err(RuntimeError::Action("vent jammed".into())));

        f.clock.set(1_100);
        f.rt.tick(0, "");
        assert!(matches!(f.rt.last_errors(), [RuntimeError::Action(msg)] if msg == "vent jammed"));
        assert_eq!(f.rt.diagnostics().next_fire_time, Some(1_200));
    }

    #[test]
    fn test_hook_may_replace_itself() {
        struct OneShot(Rc<Cell<u32>>);

        impl Hooks for OneShot {
            fn on_cycle_start(&mut self, rt: &mut Runtime) {
                self.0.set(self.0.get() + 1);
                rt.set_hooks(Box::new(NoHooks));
            }
        }

        let mut f = fixture();
        let starts = counter();
        f.rt.set_hooks(Box::new(OneShot(starts.clone())));
        for step in 1..=3 {
            f.clock.set(1_000 + step * 100);
            f.rt.tick(0, "");
        }
        assert_eq!(starts.get(), 1);
    }

    #[test]
    fn test_send_and_inbox() {
        let f = fixture();
        let sensor_a = f.rt.entities().get(1).unwrap().clone();
        let other = Runtime::new(
            f.host.clone(),
            RuntimeConfig::new(sensor_a.id()),
            f.clock.clone(),
        );

        f.rt.send(&sensor_a, "ping", "hello").unwrap();
        let inbox = other.inbox().unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].subject, "ping");
        assert_eq!(inbox[0].sender, *f.rt.owner());
        assert_eq!(inbox[0].timestamp, 1_000);
        assert!(other.inbox().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_own_mailbox_and_refreshes() {
        let mut f = fixture();
        let owner = f.rt.owner().clone();
        f.rt.send(&owner, "note", "to self").unwrap();
        f.host.spawn("Late Arrival", "Sensor", CapabilitySet::empty());
        assert_eq!(f.rt.entities().len(), 3);

        f.rt.reset().unwrap();
        assert_eq!(owner.raw_name().unwrap(), "Control");
        assert_eq!(f.rt.entities().len(), 4);
    }

    #[test]
    fn test_reset_without_owner_still_refreshes() {
        let host = Rc::new(MemoryHost::new());
        host.spawn("Sensor A", "Sensor", CapabilitySet::empty());
        let clock = ManualClock::starting_at(0);
        let mut rt = Runtime::new(host.clone(), RuntimeConfig::default(), clock.clone());
        clock.set(1_000);
        rt.tick(0, "");
        host.spawn("Sensor B", "Sensor", CapabilitySet::empty());

        rt.reset().unwrap();
        assert_eq!(rt.clock().start, 1_000);
        assert_eq!(rt.entities().len(), 2);
    }

    #[test]
    fn test_reset_with_destroyed_owner_reports_after_refresh() {
        let mut f = fixture();
        f.host.destroy(f.rt.owner().id());
        f.host.spawn("Late Arrival", "Sensor", CapabilitySet::empty());

        assert!(matches!(f.rt.reset(), Err(RuntimeError::Mail(_))));
        assert_eq!(f.rt.clock().start, 1_000);
        assert_eq!(f.rt.entities().len(), 3);
    }

    #[test]
    fn test_every_zero_fires_once() {
        let mut f = fixture();
        let fired = counter();
        let c = fired.clone();
        f.rt.every(0, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        for step in 1..=3 {
            f.clock.set(1_000 + step * 100);
            f.rt.tick(0, "");
        }
        assert_eq!(fired.get(), 1);
        assert_eq!(f.rt.diagnostics().intervals, 0);
    }

    #[test]
    fn test_refresh_drops_destroyed_entities() {
        let mut f = fixture();
        f.host.destroy(EntityId(3));
        f.rt.refresh();
        assert_eq!(f.rt.entities().len(), 2);
    }

    #[test]
    fn test_diagnostics_display() {
        let mut f = fixture();
        f.rt.on("open", |_| Ok(()));
        f.rt.every(500, |_| Ok(()));
        let text = f.rt.diagnostics().to_string();
        assert!(text.contains("commands:  [open]"));
        assert!(text.contains("intervals: 1"));
        assert!(text.contains("next at 1500"));
    }
}
