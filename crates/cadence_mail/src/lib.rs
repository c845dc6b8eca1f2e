//! # cadence_mail
//!
//! Short-message passing between entities, carried in the entities' own
//! name fields.
//!
//! This crate provides:
//!
//! - [`message`]: the [`Message`] type and its segment encoding.
//! - [`mailbox`]: posting to, reading and draining an entity's mailbox.
//! - [`codec`]: the reversible per-field text encoding.
//! - [`error`]: mail error types.

pub mod codec;
pub mod error;
pub mod mailbox;
pub mod message;

pub use error::MailError;
pub use mailbox::Broadcast;
pub use message::Message;
