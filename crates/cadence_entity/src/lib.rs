//! # cadence_entity
//!
//! Addressable host entities and the query engine built over them.
//!
//! This crate provides:
//!
//! - [`Host`]: the capability surface the runtime needs from its host.
//! - [`Entity`] / [`EntityId`]: host-backed handles with identity equality.
//! - [`CapabilityKind`] / [`Handle`]: the closed capability set and typed
//!   capability views.
//! - [`Comparison`] / [`Operator`]: the string comparisons every filter uses.
//! - [`EntityCollection`] / [`Query`]: fluent filtering, set algebra and
//!   bulk actuation.
//! - [`MemoryHost`]: an in-process host for tests and demos.

pub mod capability;
pub mod collection;
pub mod compare;
pub mod entity;
pub mod error;
pub mod host;
pub mod memory;
pub mod query;

pub use capability::{Capability, CapabilityKind, CapabilitySet, Handle};
pub use collection::EntityCollection;
pub use compare::{Comparison, Operator, compare};
pub use entity::{Entity, EntityId, MAILBOX_SEPARATOR};
pub use error::{HostError, QueryError};
pub use host::{Group, Host};
pub use memory::MemoryHost;
pub use query::Query;
