//! The capability surface the runtime needs from its host environment.
//!
//! A [`Host`] owns the physical entities. The runtime never creates or
//! destroys entities itself; it only enumerates them, reads their metadata,
//! and asks the host to act on them. Hosts are shared through `Rc<dyn Host>`
//! and take `&self` everywhere, so implementations hold their mutable state
//! behind interior mutability.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::CapabilitySet;
use crate::entity::EntityId;
use crate::error::HostError;

/// A named group of entities, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// The group's name.
    pub name: String,
    /// Member identities, in host order.
    pub members: Vec<EntityId>,
}

impl Group {
    /// Create a group from a name and its members.
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<EntityId>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

/// Host environment accessors.
///
/// Every per-entity accessor returns [`HostError::StaleEntity`] when `id`
/// no longer resolves to a live object.
pub trait Host {
    /// Every entity the host currently knows, in host order.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// Every named group, in host order.
    fn groups(&self) -> Vec<Group>;

    /// Returns `true` while `id` resolves to a live object.
    fn is_live(&self, id: EntityId) -> bool;

    /// The full name field of `id`.
    fn name(&self, id: EntityId) -> Result<String, HostError>;

    /// Overwrite the name field of `id`.
    fn set_name(&self, id: EntityId, name: &str) -> Result<(), HostError>;

    /// The type tag of `id`.
    fn type_tag(&self, id: EntityId) -> Result<String, HostError>;

    /// The capabilities `id` exposes.
    fn capabilities(&self, id: EntityId) -> Result<CapabilitySet, HostError>;

    /// Apply the named action to `id`.
    fn apply_action(&self, id: EntityId, action: &str) -> Result<(), HostError>;

    /// Read a named property of `id`.
    fn property(&self, id: EntityId, property: &str) -> Result<Value, HostError>;

    /// Write a named property of `id`.
    fn set_property(&self, id: EntityId, property: &str, value: Value) -> Result<(), HostError>;
}
