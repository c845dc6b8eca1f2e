//! Mailboxes carried in entity name fields.
//!
//! A mailbox is the tail of an entity's name field:
//!
//! ```text
//! realName<SEP>msg<SEP>msg...
//! ```
//!
//! where `<SEP>` is [`MAILBOX_SEPARATOR`] and each `msg` is one
//! [`Message::encode`] segment. Posting appends a segment; draining parses
//! every segment and truncates the field back to the real name.
//!
//! There is no locking. Two writers touching the same name field within one
//! host frame race, and the last write wins.

use cadence_entity::{Entity, EntityCollection, MAILBOX_SEPARATOR};
use tracing::{debug, warn};

use crate::error::MailError;
use crate::message::Message;

/// Split a raw name field into the real name and its pending segments.
///
/// Empty segments are skipped.
#[must_use]
pub fn split_name(raw: &str) -> (&str, Vec<&str>) {
    let mut parts = raw.split(MAILBOX_SEPARATOR);
    let real = parts.next().unwrap_or_default();
    (real, parts.filter(|s| !s.is_empty()).collect())
}

/// Append `message` to `recipient`'s mailbox.
///
/// # Errors
///
/// Returns [`MailError::Host`] if the recipient's name cannot be read or
/// written (for example, the recipient no longer exists).
pub fn post(recipient: &Entity, message: &Message) -> Result<(), MailError> {
    let mut raw = recipient.raw_name()?;
    raw.push(MAILBOX_SEPARATOR);
    raw.push_str(&message.encode());
    recipient.set_raw_name(&raw)?;
    debug!(
        sender = message.sender.id().raw(),
        recipient = recipient.id().raw(),
        subject = %message.subject,
        "message posted"
    );
    Ok(())
}

/// Number of messages waiting in `owner`'s mailbox.
///
/// # Errors
///
/// Returns [`MailError::Host`] if the name cannot be read.
pub fn pending(owner: &Entity) -> Result<usize, MailError> {
    let raw = owner.raw_name()?;
    Ok(split_name(&raw).1.len())
}

/// Parse `owner`'s mailbox without consuming it.
///
/// # Errors
///
/// Returns the first decode failure.
pub fn peek(owner: &Entity) -> Result<Vec<Message>, MailError> {
    let raw = owner.raw_name()?;
    let (_, segments) = split_name(&raw);
    segments
        .into_iter()
        .map(|segment| Message::decode(segment, owner.host()))
        .collect()
}

/// Consume every message in `owner`'s mailbox.
///
/// The name field is truncated to the real name before any segment is
/// decoded, so the mailbox is emptied even when decoding fails.
///
/// # Errors
///
/// Returns [`MailError::Host`] if the name cannot be read or written, or the
/// first decode failure. Messages in and after a failing segment are lost.
pub fn drain(owner: &Entity) -> Result<Vec<Message>, MailError> {
    let raw = owner.raw_name()?;
    let (real, segments) = split_name(&raw);
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    owner.set_raw_name(real)?;

    let mut messages = Vec::with_capacity(segments.len());
    for segment in segments {
        match Message::decode(segment, owner.host()) {
            Ok(message) => messages.push(message),
            Err(e) => {
                warn!(owner = owner.id().raw(), error = %e, "mailbox segment failed to decode");
                return Err(e);
            }
        }
    }
    debug!(owner = owner.id().raw(), count = messages.len(), "mailbox drained");
    Ok(messages)
}

/// Discard every pending message in `owner`'s mailbox.
///
/// # Errors
///
/// Returns [`MailError::Host`] if the name cannot be read or written.
pub fn clear(owner: &Entity) -> Result<(), MailError> {
    let raw = owner.raw_name()?;
    let (real, _) = split_name(&raw);
    if real.len() != raw.len() {
        owner.set_raw_name(real)?;
    }
    Ok(())
}

/// Fan a message out to every member of a collection.
pub trait Broadcast {
    /// Post `message` to every member, skipping members that fail.
    ///
    /// Returns how many members received it.
    fn send_all(&self, message: &Message) -> usize;
}

impl Broadcast for EntityCollection {
    fn send_all(&self, message: &Message) -> usize {
        self.iter()
            .filter(|recipient| match post(recipient, message) {
                Ok(()) => true,
                Err(e) => {
                    warn!(recipient = recipient.id().raw(), error = %e, "broadcast skipped member");
                    false
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use cadence_entity::{CapabilitySet, MemoryHost};

    use super::*;

    struct Fixture {
        host: Rc<MemoryHost>,
        alice: Entity,
        bob: Entity,
    }

    fn fixture() -> Fixture {
        let host = Rc::new(MemoryHost::new());
        let a = host.spawn("Alice", "ProgrammableBlock", CapabilitySet::empty());
        let b = host.spawn("Bob", "ProgrammableBlock", CapabilitySet::empty());
        Fixture {
            alice: Entity::new(a, host.clone()),
            bob: Entity::new(b, host.clone()),
            host,
        }
    }

    #[test]
    fn test_split_name() {
        let raw = format!("Bob{MAILBOX_SEPARATOR}one{MAILBOX_SEPARATOR}{MAILBOX_SEPARATOR}two");
        let (real, segments) = split_name(&raw);
        assert_eq!(real, "Bob");
        assert_eq!(segments, vec!["one", "two"]);
        assert_eq!(split_name("Plain"), ("Plain", vec![]));
    }

    #[test]
    fn test_messages_accumulate_then_drain_once() {
        let f = fixture();
        post(&f.bob, &Message::new(f.alice.clone(), "hello", "first", 10)).unwrap();
        post(&f.bob, &Message::new(f.alice.clone(), "hello", "second", 20)).unwrap();
        assert_eq!(pending(&f.bob).unwrap(), 2);
        assert_eq!(f.bob.name().unwrap(), "Bob");

        let messages = drain(&f.bob).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "first");
        assert_eq!(messages[1].body, "second");
        assert_eq!(messages[0].sender, f.alice);

        assert_eq!(f.bob.raw_name().unwrap(), "Bob");
        assert!(drain(&f.bob).unwrap().is_empty());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let f = fixture();
        post(&f.bob, &Message::new(f.alice.clone(), "s", "b", 1)).unwrap();
        assert_eq!(peek(&f.bob).unwrap().len(), 1);
        assert_eq!(pending(&f.bob).unwrap(), 1);
    }

    #[test]
    fn test_drain_empties_even_on_failure() {
        let f = fixture();
        post(&f.bob, &Message::new(f.alice.clone(), "s", "b", 1)).unwrap();
        f.host.destroy(f.alice.id());

        assert_eq!(drain(&f.bob), Err(MailError::SenderNotFound(f.alice.id())));
        assert_eq!(f.bob.raw_name().unwrap(), "Bob");
    }

    #[test]
    fn test_drain_malformed_segment() {
        let f = fixture();
        f.bob
            .set_raw_name(&format!("Bob{MAILBOX_SEPARATOR}garbage"))
            .unwrap();
        assert!(matches!(drain(&f.bob), Err(MailError::Malformed(_))));
    }

    #[test]
    fn test_clear() {
        let f = fixture();
        post(&f.bob, &Message::new(f.alice.clone(), "s", "b", 1)).unwrap();
        clear(&f.bob).unwrap();
        assert_eq!(f.bob.raw_name().unwrap(), "Bob");
    }

    #[test]
    fn test_broadcast_skips_stale_recipients() {
        let f = fixture();
        let carol = f.host.spawn("Carol", "ProgrammableBlock", CapabilitySet::empty());
        let all = EntityCollection::from_host(f.host.clone());
        f.host.destroy(carol);

        let msg = Message::new(f.alice.clone(), "status", "ready", 5);
        assert_eq!(all.send_all(&msg), 2);
        assert_eq!(pending(&f.alice).unwrap(), 1);
        assert_eq!(pending(&f.bob).unwrap(), 1);
    }
}
