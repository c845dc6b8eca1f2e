//! Ordered entity collections with fluent filtering and set algebra.
//!
//! Every filter returns a new [`EntityCollection`]; the receiver is only
//! ever changed by [`EntityCollection::add`]. Filters keep the receiver's
//! order and never introduce duplicates.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::capability::{
    ACTION_DISABLE, ACTION_ENABLE, ACTION_TOGGLE, Capability, CapabilityKind, Functional,
};
use crate::compare::{Comparison, Operator};
use crate::entity::{Entity, EntityId};
use crate::error::{HostError, QueryError};
use crate::host::Host;
use crate::query::Query;

/// An ordered sequence of entity handles.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EntityCollection {
    entities: Vec<Entity>,
}

impl EntityCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate every entity the host currently knows.
    #[must_use]
    pub fn from_host(host: Rc<dyn Host>) -> Self {
        host.entity_ids()
            .into_iter()
            .map(|id| Entity::new(id, host.clone()))
            .collect()
    }

    /// Append an entity. This is the only operation that mutates a
    /// collection, and the only way to hold the same entity twice.
    pub fn add(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Number of entities held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the collection holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// The entity at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Returns `true` if an entity with the same identity is held.
    #[must_use]
    pub fn contains(&self, entity: &Entity) -> bool {
        self.entities.iter().any(|e| e.id() == entity.id())
    }

    /// Identities in order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(Entity::id).collect()
    }

    /// Start a lazy filter chain over this collection.
    pub fn query(&self) -> Query<'_> {
        Query::new(&self.entities)
    }

    // ── Filters ─────────────────────────────────────────────────────────────

    /// Keep entities exposing `kind`.
    #[must_use]
    pub fn with_capability(&self, kind: CapabilityKind) -> Self {
        self.query().of_capability(kind).collect()
    }

    /// Keep entities exposing capability `C`.
    #[must_use]
    pub fn of<C: Capability>(&self) -> Self {
        self.with_capability(C::KIND)
    }

    /// Keep entities whose type tag compares true against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPattern`] for an uncompilable regex.
    pub fn with_type(&self, op: Operator, pattern: &str) -> Result<Self, QueryError> {
        let cmp = Comparison::new(op, pattern)?;
        Ok(self.query().of_type(cmp).collect())
    }

    /// Keep entities whose display name compares true against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPattern`] for an uncompilable regex.
    pub fn with_name(&self, op: Operator, pattern: &str) -> Result<Self, QueryError> {
        let cmp = Comparison::new(op, pattern)?;
        Ok(self.query().named(cmp).collect())
    }

    /// Keep entities that belong to any host group whose name compares true
    /// against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPattern`] for an uncompilable regex.
    pub fn in_group(&self, op: Operator, pattern: &str) -> Result<Self, QueryError> {
        let cmp = Comparison::new(op, pattern)?;
        Ok(self.query().in_group(&cmp).collect())
    }

    /// Keep entities for which `predicate` returns `true`.
    #[must_use]
    pub fn filter_by(&self, predicate: impl Fn(&Entity) -> bool) -> Self {
        self.query().by(predicate).collect()
    }

    /// The first entity, or an empty collection.
    #[must_use]
    pub fn first(&self) -> Self {
        self.entities.iter().take(1).cloned().collect()
    }

    // ── Set algebra ─────────────────────────────────────────────────────────

    /// Union: this collection in order, followed by the members of `other`
    /// not already present. Each identity appears once, at its first
    /// occurrence, even if this collection held it twice.
    #[must_use]
    pub fn plus(&self, other: &EntityCollection) -> Self {
        let mut seen = HashSet::new();
        self.iter()
            .chain(other)
            .filter(|e| seen.insert(e.id()))
            .cloned()
            .collect()
    }

    /// Difference: this collection without any member of `other`.
    #[must_use]
    pub fn minus(&self, other: &EntityCollection) -> Self {
        let removed: HashSet<EntityId> = other.iter().map(Entity::id).collect();
        self.query().by(|e| !removed.contains(&e.id())).collect()
    }

    /// Assert the collection is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyResult`] carrying `message` if empty.
    pub fn find_or_fail(self, message: impl Into<String>) -> Result<Self, QueryError> {
        if self.is_empty() {
            Err(QueryError::EmptyResult(message.into()))
        } else {
            Ok(self)
        }
    }

    // ── Bulk actuation ──────────────────────────────────────────────────────

    /// Run `op` on every member, logging and skipping failures.
    ///
    /// Returns how many members succeeded.
    pub fn for_each_member(
        &self,
        what: &str,
        mut op: impl FnMut(&Entity) -> Result<(), HostError>,
    ) -> usize {
        let mut succeeded = 0;
        for entity in &self.entities {
            match op(entity) {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(
                    entity = entity.id().raw(),
                    op = what,
                    error = %e,
                    "bulk operation skipped member"
                ),
            }
        }
        debug!(op = what, succeeded, total = self.len(), "bulk operation finished");
        succeeded
    }

    /// Apply a named action to every member.
    pub fn apply_action(&self, action: &str) -> usize {
        self.for_each_member(action, |e| e.apply(action))
    }

    /// Set a property on every member. Members lacking the property, or
    /// holding a differently typed value, are skipped.
    pub fn set_property(&self, property: &str, value: &Value) -> usize {
        self.for_each_member(property, |e| e.set_property(property, value.clone()))
    }

    /// Switch every functional member on.
    pub fn enable(&self) -> usize {
        self.of::<Functional>().apply_action(ACTION_ENABLE)
    }

    /// Switch every functional member off.
    pub fn disable(&self) -> usize {
        self.of::<Functional>().apply_action(ACTION_DISABLE)
    }

    /// Flip every functional member.
    pub fn toggle(&self) -> usize {
        self.of::<Functional>().apply_action(ACTION_TOGGLE)
    }
}

impl FromIterator<Entity> for EntityCollection {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Entity>> for EntityCollection {
    fn from(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl IntoIterator for EntityCollection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

impl fmt::Debug for EntityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entities.iter().map(|e| e.id().raw()))
            .finish()
    }
}
