//! The closed set of capabilities a host entity can expose.
//!
//! Hosts report capabilities as a [`CapabilitySet`]. Code that needs a
//! specific capability asks for a typed [`Handle`] with
//! [`Entity::try_as`](crate::Entity::try_as), which only succeeds when the
//! entity actually exposes it.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::HostError;

/// Property holding the on/off state of a [`Functional`] entity.
pub const ENABLED_PROPERTY: &str = "Enabled";
/// Action that flips a [`Functional`] entity on or off.
pub const ACTION_TOGGLE: &str = "OnOff";
/// Action that switches a [`Functional`] entity on.
pub const ACTION_ENABLE: &str = "OnOff_On";
/// Action that switches a [`Functional`] entity off.
pub const ACTION_DISABLE: &str = "OnOff_Off";

/// One capability in the closed capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// Exposes named actions and properties.
    Terminal,
    /// Can be switched on and off.
    Functional,
    /// Opens and closes.
    Door,
    /// Detects nearby objects.
    Sensor,
    /// Moves air in and out of a room.
    AirVent,
    /// Displays text.
    TextSurface,
}

impl CapabilityKind {
    /// Every capability, in declaration order.
    pub const ALL: [CapabilityKind; 6] = [
        CapabilityKind::Terminal,
        CapabilityKind::Functional,
        CapabilityKind::Door,
        CapabilityKind::Sensor,
        CapabilityKind::AirVent,
        CapabilityKind::TextSurface,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A set of [`CapabilityKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A set containing exactly `kinds`.
    #[must_use]
    pub fn of(kinds: &[CapabilityKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, &kind| set.with(kind))
    }

    /// Returns this set with `kind` added.
    #[must_use]
    pub const fn with(self, kind: CapabilityKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Returns `true` if `kind` is in the set.
    #[must_use]
    pub const fn contains(self, kind: CapabilityKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

/// Marker type naming one [`CapabilityKind`] at the type level.
pub trait Capability {
    /// The capability this marker stands for.
    const KIND: CapabilityKind;
}

macro_rules! capability_marker {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl Capability for $name {
                const KIND: CapabilityKind = CapabilityKind::$name;
            }
        )*
    };
}

capability_marker!(
    /// Marker for [`CapabilityKind::Terminal`].
    Terminal,
    /// Marker for [`CapabilityKind::Functional`].
    Functional,
    /// Marker for [`CapabilityKind::Door`].
    Door,
    /// Marker for [`CapabilityKind::Sensor`].
    Sensor,
    /// Marker for [`CapabilityKind::AirVent`].
    AirVent,
    /// Marker for [`CapabilityKind::TextSurface`].
    TextSurface,
);

/// An entity known to expose capability `C`.
#[derive(Clone)]
pub struct Handle<C: Capability> {
    entity: Entity,
    _capability: PhantomData<C>,
}

impl<C: Capability> Handle<C> {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            entity,
            _capability: PhantomData,
        }
    }

    /// The underlying entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Unwrap into the underlying entity.
    #[must_use]
    pub fn into_entity(self) -> Entity {
        self.entity
    }
}

impl<C: Capability> Deref for Handle<C> {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

impl<C: Capability> fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("entity", &self.entity)
            .field("capability", &C::KIND)
            .finish()
    }
}

impl Handle<Functional> {
    /// Switch the entity on.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the host rejects the action.
    pub fn enable(&self) -> Result<(), HostError> {
        self.entity.apply(ACTION_ENABLE)
    }

    /// Switch the entity off.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the host rejects the action.
    pub fn disable(&self) -> Result<(), HostError> {
        self.entity.apply(ACTION_DISABLE)
    }

    /// Flip the on/off state.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the host rejects the action.
    pub fn toggle(&self) -> Result<(), HostError> {
        self.entity.apply(ACTION_TOGGLE)
    }

    /// Returns the current on/off state.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::PropertyAccess`] if the host does not report a
    /// boolean [`ENABLED_PROPERTY`].
    pub fn is_enabled(&self) -> Result<bool, HostError> {
        match self.entity.property(ENABLED_PROPERTY)? {
            Value::Bool(enabled) => Ok(enabled),
            other => Err(HostError::PropertyAccess {
                id: self.entity.id(),
                property: ENABLED_PROPERTY.to_string(),
                reason: format!("expected a boolean, found {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::memory::MemoryHost;

    #[test]
    fn test_set_membership() {
        let set = CapabilitySet::of(&[CapabilityKind::Door, CapabilityKind::Functional]);
        assert!(set.contains(CapabilityKind::Door));
        assert!(set.contains(CapabilityKind::Functional));
        assert!(!set.contains(CapabilityKind::Sensor));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![CapabilityKind::Functional, CapabilityKind::Door]
        );
        assert!(CapabilitySet::empty().is_empty());
    }

    #[test]
    fn test_try_as_requires_capability() {
        let host = Rc::new(MemoryHost::new());
        let vent = host.spawn(
            "Vent",
            "AirVent",
            CapabilitySet::of(&[CapabilityKind::AirVent, CapabilityKind::Functional]),
        );
        let panel = host.spawn("Panel", "TextPanel", CapabilitySet::of(&[CapabilityKind::TextSurface]));

        let vent = Entity::new(vent, host.clone());
        let panel = Entity::new(panel, host);
        assert!(vent.try_as::<AirVent>().is_some());
        assert!(vent.try_as::<Functional>().is_some());
        assert!(panel.try_as::<Functional>().is_none());
    }

    #[test]
    fn test_functional_handle_switches_state() {
        let host = Rc::new(MemoryHost::new());
        let id = host.spawn("Light", "InteriorLight", CapabilitySet::of(&[CapabilityKind::Functional]));
        let light = Entity::new(id, host).try_as::<Functional>().unwrap();

        assert!(light.is_enabled().unwrap());
        light.disable().unwrap();
        assert!(!light.is_enabled().unwrap());
        light.toggle().unwrap();
        assert!(light.is_enabled().unwrap());
        light.enable().unwrap();
        assert!(light.is_enabled().unwrap());
    }
}
