//! In-memory [`Host`] implementation.
//!
//! Holds entities, groups and properties in plain maps. Used by tests and by
//! the demo driver; a real host adapter replaces it in production.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::capability::{
    ACTION_DISABLE, ACTION_ENABLE, ACTION_TOGGLE, CapabilityKind, CapabilitySet, ENABLED_PROPERTY,
};
use crate::entity::EntityId;
use crate::error::HostError;
use crate::host::{Group, Host};

#[derive(Debug)]
struct Record {
    name: String,
    type_tag: String,
    capabilities: CapabilitySet,
    properties: HashMap<String, Value>,
    actions: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    order: Vec<EntityId>,
    records: HashMap<EntityId, Record>,
    groups: Vec<Group>,
    action_log: Vec<(EntityId, String)>,
}

/// A [`Host`] backed by in-process maps.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: RefCell<Inner>,
}

impl MemoryHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity and return its identity. Ids start at 1.
    ///
    /// Functional entities start switched on.
    pub fn spawn(&self, name: &str, type_tag: &str, capabilities: CapabilitySet) -> EntityId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = EntityId(inner.next_id);

        let mut properties = HashMap::new();
        if capabilities.contains(CapabilityKind::Functional) {
            properties.insert(ENABLED_PROPERTY.to_string(), Value::Bool(true));
        }

        inner.order.push(id);
        inner.records.insert(
            id,
            Record {
                name: name.to_string(),
                type_tag: type_tag.to_string(),
                capabilities,
                properties,
                actions: HashSet::new(),
            },
        );
        id
    }

    /// Remove an entity. Existing handles to it become stale.
    ///
    /// Returns `true` if the entity existed.
    pub fn destroy(&self, id: EntityId) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.order.retain(|e| *e != id);
        inner.records.remove(&id).is_some()
    }

    /// Add a named group.
    pub fn add_group(&self, name: &str, members: Vec<EntityId>) {
        self.inner.borrow_mut().groups.push(Group::new(name, members));
    }

    /// Allow `action` to be applied to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if `id` does not exist.
    pub fn define_action(&self, id: EntityId, action: &str) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::StaleEntity(id))?;
        record.actions.insert(action.to_string());
        Ok(())
    }

    /// Create or replace a property without type checking.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::StaleEntity`] if `id` does not exist.
    pub fn insert_property(&self, id: EntityId, property: &str, value: Value) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::StaleEntity(id))?;
        record.properties.insert(property.to_string(), value);
        Ok(())
    }

    /// Every action applied so far, oldest first.
    #[must_use]
    pub fn action_log(&self) -> Vec<(EntityId, String)> {
        self.inner.borrow().action_log.clone()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().order.len()
    }

    /// Returns `true` if the host holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_record<T>(&self, id: EntityId, f: impl FnOnce(&Record) -> T) -> Result<T, HostError> {
        let inner = self.inner.borrow();
        inner.records.get(&id).map(f).ok_or(HostError::StaleEntity(id))
    }
}

fn same_json_type(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

impl Host for MemoryHost {
    fn entity_ids(&self) -> Vec<EntityId> {
        self.inner.borrow().order.clone()
    }

    fn groups(&self) -> Vec<Group> {
        self.inner.borrow().groups.clone()
    }

    fn is_live(&self, id: EntityId) -> bool {
        self.inner.borrow().records.contains_key(&id)
    }

    fn name(&self, id: EntityId) -> Result<String, HostError> {
        self.with_record(id, |r| r.name.clone())
    }

    fn set_name(&self, id: EntityId, name: &str) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::StaleEntity(id))?;
        record.name = name.to_string();
        Ok(())
    }

    fn type_tag(&self, id: EntityId) -> Result<String, HostError> {
        self.with_record(id, |r| r.type_tag.clone())
    }

    fn capabilities(&self, id: EntityId) -> Result<CapabilitySet, HostError> {
        self.with_record(id, |r| r.capabilities)
    }

    fn apply_action(&self, id: EntityId, action: &str) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::StaleEntity(id))?;

        let switch = match action {
            ACTION_TOGGLE => Some(None),
            ACTION_ENABLE => Some(Some(true)),
            ACTION_DISABLE => Some(Some(false)),
            _ => None,
        };

        match switch {
            Some(target) => {
                if !record.capabilities.contains(CapabilityKind::Functional) {
                    return Err(HostError::NotSupported {
                        id,
                        capability: CapabilityKind::Functional,
                    });
                }
                let current = matches!(record.properties.get(ENABLED_PROPERTY), Some(Value::Bool(true)));
                let next = target.unwrap_or(!current);
                record
                    .properties
                    .insert(ENABLED_PROPERTY.to_string(), Value::Bool(next));
            }
            None if record.actions.contains(action) => {}
            None => {
                return Err(HostError::UnknownAction {
                    id,
                    action: action.to_string(),
                });
            }
        }

        inner.action_log.push((id, action.to_string()));
        Ok(())
    }

    fn property(&self, id: EntityId, property: &str) -> Result<Value, HostError> {
        self.with_record(id, |r| r.properties.get(property).cloned())?
            .ok_or_else(|| HostError::PropertyAccess {
                id,
                property: property.to_string(),
                reason: "unknown property".to_string(),
            })
    }

    fn set_property(&self, id: EntityId, property: &str, value: Value) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::StaleEntity(id))?;

        let Some(current) = record.properties.get_mut(property) else {
            return Err(HostError::PropertyAccess {
                id,
                property: property.to_string(),
                reason: "unknown property".to_string(),
            });
        };
        if !same_json_type(current, &value) {
            return Err(HostError::PropertyAccess {
                id,
                property: property.to_string(),
                reason: format!("type mismatch: cannot assign {value} over {current}"),
            });
        }
        *current = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let host = MemoryHost::new();
        let a = host.spawn("A", "Light", CapabilitySet::empty());
        let b = host.spawn("B", "Light", CapabilitySet::empty());
        assert_eq!(a, EntityId(1));
        assert_eq!(b, EntityId(2));
        assert_eq!(host.entity_ids(), vec![a, b]);
        assert_eq!(host.len(), 2);
    }

    #[test]
    fn test_destroy_makes_entity_stale() {
        let host = MemoryHost::new();
        let a = host.spawn("A", "Light", CapabilitySet::empty());
        assert!(host.destroy(a));
        assert!(!host.destroy(a));
        assert!(!host.is_live(a));
        assert_eq!(host.name(a), Err(HostError::StaleEntity(a)));
        assert!(host.is_empty());
    }

    #[test]
    fn test_property_type_mismatch_rejected() {
        let host = MemoryHost::new();
        let id = host.spawn("Vent", "AirVent", CapabilitySet::empty());
        host.insert_property(id, "Depressurize", json!(false)).unwrap();

        assert!(host.set_property(id, "Depressurize", json!(true)).is_ok());
        assert!(matches!(
            host.set_property(id, "Depressurize", json!("yes")),
            Err(HostError::PropertyAccess { .. })
        ));
        assert!(matches!(
            host.set_property(id, "Missing", json!(1)),
            Err(HostError::PropertyAccess { .. })
        ));
        assert_eq!(host.property(id, "Depressurize").unwrap(), json!(true));
    }

    #[test]
    fn test_actions_require_definition() {
        let host = MemoryHost::new();
        let id = host.spawn("Door", "Door", CapabilitySet::of(&[CapabilityKind::Door]));

        assert!(matches!(
            host.apply_action(id, "Open"),
            Err(HostError::UnknownAction { .. })
        ));
        assert!(matches!(
            host.apply_action(id, ACTION_TOGGLE),
            Err(HostError::NotSupported { .. })
        ));

        host.define_action(id, "Open").unwrap();
        host.apply_action(id, "Open").unwrap();
        assert_eq!(host.action_log(), vec![(id, "Open".to_string())]);
    }
}
