//! Lazy entity query pipeline.
//!
//! A [`Query`] stacks filter predicates over a borrowed entity slice and
//! evaluates them in a single pass when materialised. The eager filters on
//! [`EntityCollection`] are built from the same predicates, so a chain of
//! eager filters and the equivalent query always select the same entities
//! in the same order.

use std::collections::HashSet;

use crate::capability::CapabilityKind;
use crate::collection::EntityCollection;
use crate::compare::Comparison;
use crate::entity::{Entity, EntityId};
use crate::host::Host;

type Predicate<'a> = Box<dyn Fn(&Entity) -> bool + 'a>;

/// Matches an entity's type tag. Stale entities never match.
pub(crate) fn type_matches(entity: &Entity, cmp: &Comparison) -> bool {
    entity.type_tag().is_ok_and(|tag| cmp.test(&tag))
}

/// Matches an entity's display name. Stale entities never match.
pub(crate) fn name_matches(entity: &Entity, cmp: &Comparison) -> bool {
    entity.name().is_ok_and(|name| cmp.test(&name))
}

/// Members of every host group whose name satisfies `cmp`.
pub(crate) fn group_members(host: &dyn Host, cmp: &Comparison) -> HashSet<EntityId> {
    host.groups()
        .into_iter()
        .filter(|group| cmp.test(&group.name))
        .flat_map(|group| group.members)
        .collect()
}

/// A deferred filter chain over a set of entities.
#[must_use = "a query does nothing until collected"]
pub struct Query<'a> {
    source: &'a [Entity],
    predicates: Vec<Predicate<'a>>,
}

impl<'a> Query<'a> {
    /// Start a query over `source` with no filters.
    pub fn new(source: &'a [Entity]) -> Self {
        Self {
            source,
            predicates: Vec::new(),
        }
    }

    /// Keep entities exposing `kind`.
    pub fn of_capability(mut self, kind: CapabilityKind) -> Self {
        self.predicates
            .push(Box::new(move |e: &Entity| e.has_capability(kind)));
        self
    }

    /// Keep entities whose type tag satisfies `cmp`.
    pub fn of_type(mut self, cmp: Comparison) -> Self {
        self.predicates
            .push(Box::new(move |e: &Entity| type_matches(e, &cmp)));
        self
    }

    /// Keep entities whose display name satisfies `cmp`.
    pub fn named(mut self, cmp: Comparison) -> Self {
        self.predicates
            .push(Box::new(move |e: &Entity| name_matches(e, &cmp)));
        self
    }

    /// Keep entities belonging to a host group whose name satisfies `cmp`.
    ///
    /// Group membership is resolved once, when this filter is added.
    pub fn in_group(mut self, cmp: &Comparison) -> Self {
        let members = self
            .source
            .first()
            .map(|e| group_members(e.host().as_ref(), cmp))
            .unwrap_or_default();
        self.predicates
            .push(Box::new(move |e: &Entity| members.contains(&e.id())));
        self
    }

    /// Keep entities satisfying an arbitrary predicate.
    pub fn by(mut self, predicate: impl Fn(&Entity) -> bool + 'a) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Returns `true` if `entity` passes every stacked filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.predicates.iter().all(|p| p(entity))
    }

    /// Materialise the matching entities, in source order.
    pub fn collect(self) -> EntityCollection {
        self.source
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }

    /// The first matching entity, stopping at the first hit.
    #[must_use]
    pub fn first(self) -> Option<Entity> {
        self.source.iter().find(|e| self.matches(e)).cloned()
    }

    /// Count matches without materialising them.
    #[must_use]
    pub fn count(self) -> usize {
        self.source.iter().filter(|e| self.matches(e)).count()
    }
}
