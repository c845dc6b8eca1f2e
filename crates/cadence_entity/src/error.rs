//! Host access and query error types.

use crate::capability::CapabilityKind;
use crate::entity::EntityId;

/// Errors reported by a [`Host`](crate::Host) when an entity is accessed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// The entity was destroyed after its handle was created.
    #[error("entity {0} no longer exists")]
    StaleEntity(EntityId),

    /// The host does not know the named action for this entity.
    #[error("{id} has no action '{action}'")]
    UnknownAction {
        /// The entity the action was applied to.
        id: EntityId,
        /// The action name.
        action: String,
    },

    /// A property read or write failed (unknown identifier or type mismatch).
    #[error("property '{property}' on {id}: {reason}")]
    PropertyAccess {
        /// The entity whose property was accessed.
        id: EntityId,
        /// The property identifier.
        property: String,
        /// Why the access failed.
        reason: String,
    },

    /// The operation needs a capability the entity does not expose.
    #[error("{id} does not support {capability}")]
    NotSupported {
        /// The entity.
        id: EntityId,
        /// The missing capability.
        capability: CapabilityKind,
    },
}

/// Errors raised while building or asserting entity queries.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// `find_or_fail` was called on an empty collection.
    #[error("{0}")]
    EmptyResult(String),

    /// A regex comparison was given a pattern that does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compiler's error.
        #[source]
        source: regex::Error,
    },

    /// An operator symbol did not name any comparison.
    #[error("unknown comparison operator: {0}")]
    UnknownOperator(String),
}
