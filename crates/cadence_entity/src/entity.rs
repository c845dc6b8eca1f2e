//! Entity identifiers and host-backed entity handles.
//!
//! An [`EntityId`] is the opaque identity the host assigns to a physical
//! object. An [`Entity`] pairs that identity with the [`Host`] that owns the
//! object, so name, type and capability reads always go to live host state.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{Capability, CapabilityKind, CapabilitySet, Handle};
use crate::error::HostError;
use crate::host::Host;

/// Separates an entity's real name from the mailbox payload appended to it.
///
/// The character never appears in mailbox field encodings, so the first
/// occurrence always marks the end of the real name.
pub const MAILBOX_SEPARATOR: char = '\u{1e}';

/// A unique entity identifier.
///
/// Identifiers are assigned by the host and stay stable for the lifetime of
/// the underlying object. `0` is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid identifier sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an identifier from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) identifier.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A handle to a host-managed object.
///
/// Handles are cheap to clone and compare by [`EntityId`] only. A handle is
/// not invalidated when the host destroys the object; every accessor then
/// returns [`HostError::StaleEntity`] instead.
#[derive(Clone)]
pub struct Entity {
    id: EntityId,
    host: Rc<dyn Host>,
}

impl Entity {
    /// Create a handle for `id` owned by `host`.
    #[must_use]
    pub fn new(id: EntityId, host: Rc<dyn Host>) -> Self {
        Self { id, host }
    }

    /// Returns the entity's identity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the host that owns this entity.
    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Returns `true` while the host still knows this entity.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.host.is_live(self.id)
    }

    /// The full name field, including any pending mailbox payload.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if the entity no longer exists.
    pub fn raw_name(&self) -> Result<String, HostError> {
        self.host.name(self.id)
    }

    /// The display name with any mailbox payload stripped.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if the entity no longer exists.
    pub fn name(&self) -> Result<String, HostError> {
        let raw = self.raw_name()?;
        Ok(match raw.split_once(MAILBOX_SEPARATOR) {
            Some((real, _)) => real.to_string(),
            None => raw,
        })
    }

    /// Overwrite the whole name field, mailbox included.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if the entity no longer exists.
    pub fn set_raw_name(&self, raw: &str) -> Result<(), HostError> {
        self.host.set_name(self.id, raw)
    }

    /// Change the display name, keeping any pending mailbox payload.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if the entity no longer exists.
    pub fn rename(&self, name: &str) -> Result<(), HostError> {
        let raw = self.raw_name()?;
        let renamed = match raw.find(MAILBOX_SEPARATOR) {
            Some(at) => format!("{name}{}", &raw[at..]),
            None => name.to_string(),
        };
        self.set_raw_name(&renamed)
    }

    /// The host's type tag for this entity (immutable for its lifetime).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if the entity no longer exists.
    pub fn type_tag(&self) -> Result<String, HostError> {
        self.host.type_tag(self.id)
    }

    /// The capabilities this entity exposes. Stale entities expose none.
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.host.capabilities(self.id).unwrap_or_default()
    }

    /// Returns `true` if the entity exposes `kind`.
    #[must_use]
    pub fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.capabilities().contains(kind)
    }

    /// View this entity through capability `C`, if it has it.
    #[must_use]
    pub fn try_as<C: Capability>(&self) -> Option<Handle<C>> {
        self.has_capability(C::KIND)
            .then(|| Handle::new(self.clone()))
    }

    /// Apply a named host action.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the entity is stale or the action is unknown.
    pub fn apply(&self, action: &str) -> Result<(), HostError> {
        self.host.apply_action(self.id, action)
    }

    /// Read a named property.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::PropertyAccess`] if the property does not exist.
    pub fn property(&self, property: &str) -> Result<Value, HostError> {
        self.host.property(self.id, property)
    }

    /// Write a named property.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::PropertyAccess`] on an unknown identifier or a
    /// value of the wrong type.
    pub fn set_property(&self, property: &str, value: Value) -> Result<(), HostError> {
        self.host.set_property(self.id, property, value)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.id.0).finish()
    }
}
