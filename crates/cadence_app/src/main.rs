//! # cadence
//!
//! Drives a [`Runtime`] over an in-memory hangar scenario with a manual
//! clock, the way a host game would call a script once per frame.
//!
//! The scenario registers one of each kind of work:
//!
//! - an interval that cycles the air vents and writes a status line,
//! - a one-shot schedule entry that trips the hangar sensor,
//! - an event that seals the hangar doors once the sensor trips,
//! - per-entity events that report each door as it closes,
//! - a command callback that posts a status message to the runtime's own
//!   mailbox, drained on the next interval.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use cadence_entity::capability::ENABLED_PROPERTY;
use cadence_entity::{CapabilityKind, CapabilitySet, EntityId, MemoryHost, Operator};
use cadence_runtime::{Hooks, ManualClock, Runtime, RuntimeConfig, Tap, TickOutcome};
use clap::Parser;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence", about = "Run the cadence scheduler over a demo host")]
struct Args {
    /// Number of host calls to make
    #[arg(short, long, default_value_t = 20)]
    ticks: u32,

    /// Milliseconds the host clock advances between calls
    #[arg(short, long, default_value_t = 400)]
    step_ms: u64,

    /// Minimum milliseconds between full cycles (overrides the config file)
    #[arg(short, long)]
    min_interval_ms: Option<u64>,

    /// JSON runtime configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Argument passed with every call (e.g. "status")
    #[arg(short, long, default_value = "")]
    argument: String,

    /// Print the final diagnostics as JSON
    #[arg(long)]
    json: bool,
}

/// Logs throttling and lets every postponed cycle through.
struct TraceHooks;

impl Hooks for TraceHooks {
    fn on_throttled(&mut self, _rt: &mut Runtime, transpired: f64) {
        debug!(transpired, "call throttled");
    }

    fn on_single_tap(&mut self, rt: &mut Runtime) -> Tap {
        info!(clock = rt.clock().clock, "single tap");
        Tap::Proceed
    }

    fn on_double_tap(&mut self, rt: &mut Runtime) -> Tap {
        info!(clock = rt.clock().clock, "double tap");
        Tap::Proceed
    }
}

struct Hangar {
    host: Rc<MemoryHost>,
    control: EntityId,
    sensor: EntityId,
    panel: EntityId,
}

fn build_hangar() -> Result<Hangar> {
    let host = Rc::new(MemoryHost::new());
    let functional = CapabilitySet::of(&[CapabilityKind::Terminal, CapabilityKind::Functional]);

    let control = host.spawn("Hangar Control", "ProgrammableBlock", functional);
    let doors = [
        host.spawn("Hangar Door Port", "Door", functional.with(CapabilityKind::Door)),
        host.spawn("Hangar Door Starboard", "Door", functional.with(CapabilityKind::Door)),
    ];
    let vents = [
        host.spawn("Vent 1", "AirVent", functional.with(CapabilityKind::AirVent)),
        host.spawn("Vent 2", "AirVent", functional.with(CapabilityKind::AirVent)),
    ];
    let sensor = host.spawn("Hangar Sensor", "Sensor", functional.with(CapabilityKind::Sensor));
    let panel = host.spawn(
        "Hangar Panel",
        "TextPanel",
        CapabilitySet::of(&[CapabilityKind::Terminal, CapabilityKind::TextSurface]),
    );

    for door in doors {
        host.define_action(door, "Open")?;
        host.define_action(door, "Close")?;
        host.insert_property(door, "Open", Value::Bool(true))?;
    }
    host.insert_property(sensor, "IsActive", Value::Bool(false))?;
    host.insert_property(panel, "Text", Value::String(String::new()))?;

    let mut hangar = doors.to_vec();
    hangar.extend(vents);
    host.add_group("Hangar", hangar);

    Ok(Hangar {
        host,
        control,
        sensor,
        panel,
    })
}

fn register_scenario(rt: &mut Runtime, hangar: &Hangar) {
    let sensor_id = hangar.sensor;
    let panel_id = hangar.panel;

    rt.every(1_000, move |rt| {
        let vents = rt.entities().with_type(Operator::Equal, "AirVent")?;
        let toggled = vents.toggle();

        for message in rt.inbox()? {
            info!(
                from = %message.sender.id(),
                subject = %message.subject,
                body = %message.body,
                "inbox"
            );
        }

        let panel = rt.entities().with_name(Operator::Equal, "Hangar Panel")?;
        let line = format!("t={} vents toggled={toggled}", rt.clock().clock);
        panel.set_property("Text", &Value::String(line));
        debug!(panel = %panel_id, "status written");
        Ok(())
    });

    rt.at(3_000, move |rt| {
        let sensors = rt.entities().filter_by(|e| e.id() == sensor_id);
        sensors.set_property("IsActive", &json!(true));
        info!(sensor = %sensor_id, "sensor tripped");
        Ok(())
    });

    rt.when(
        move |rt| {
            rt.entities()
                .iter()
                .find(|e| e.id() == sensor_id)
                .and_then(|e| e.property("IsActive").ok())
                .is_some_and(|v| v == Value::Bool(true))
        },
        |rt| {
            let doors = rt
                .entities()
                .in_group(Operator::Equal, "Hangar")?
                .with_type(Operator::Equal, "Door")?
                .find_or_fail("hangar has no doors")?;
            let closed = doors.apply_action("Close");
            doors.set_property("Open", &Value::Bool(false));
            info!(closed, "hangar sealed");
            Ok(false)
        },
    );

    let doors = rt.entities().with_capability(CapabilityKind::Door);
    rt.when_each(
        &doors,
        |door| door.property("Open").is_ok_and(|v| v == Value::Bool(false)),
        |door, rt| {
            let name = door.name()?;
            info!(door = %name, clock = rt.clock().clock, "door reports closed");
            Ok(false)
        },
    );

    rt.on("status", |rt| {
        let owner = rt.owner().clone();
        let powered = rt
            .entities()
            .with_capability(CapabilityKind::Functional)
            .filter_by(|e| {
                e.property(ENABLED_PROPERTY)
                    .is_ok_and(|v| v == Value::Bool(true))
            })
            .len();
        rt.send(&owner, "status", &format!("{powered} blocks powered"))?;
        Ok(())
    });
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "cadence=info".into()),
        )
        .init();

    let args = Args::parse();

    let hangar = build_hangar()?;
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if config.owner == EntityId::INVALID {
        config.owner = hangar.control;
    }
    if let Some(min_interval) = args.min_interval_ms {
        config.min_interval_ms = min_interval;
    }
    info!(
        owner = %config.owner,
        min_interval_ms = config.min_interval_ms,
        ticks = args.ticks,
        step_ms = args.step_ms,
        "starting"
    );

    let clock = ManualClock::starting_at(0);
    let mut rt =
        Runtime::new(hangar.host.clone(), config, clock.clone()).with_hooks(TraceHooks);
    register_scenario(&mut rt, &hangar);

    let mut throttled = 0u32;
    for _ in 0..args.ticks {
        clock.advance(args.step_ms);
        match rt.tick_default(&args.argument) {
            TickOutcome::Ran => {}
            TickOutcome::Throttled { .. } => throttled += 1,
            TickOutcome::Postponed => warn!("cycle postponed"),
        }
        for error in rt.last_errors() {
            warn!(%error, "tick reported an error");
        }
    }

    let diagnostics = rt.diagnostics();
    info!(
        cycles = diagnostics.cycles,
        throttled,
        actions = hangar.host.action_log().len(),
        "finished"
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        println!("{diagnostics}");
    }
    Ok(())
}
