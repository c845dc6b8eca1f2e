//! Messages exchanged between entities through their mailboxes.

use std::rc::Rc;

use cadence_entity::{Entity, EntityId, Host};

use crate::codec::{FIELD_SEPARATOR, decode_field, encode_field};
use crate::error::MailError;

/// A short message from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The entity that sent the message.
    pub sender: Entity,
    /// A short subject line, typically used to route the message.
    pub subject: String,
    /// Free-form payload.
    pub body: String,
    /// Sender's clock when the message was created.
    pub timestamp: u64,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(
        sender: Entity,
        subject: impl Into<String>,
        body: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            sender,
            subject: subject.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// Encode as one mailbox segment:
    /// `enc(sender):enc(subject):enc(body):enc(timestamp)`.
    #[must_use]
    pub fn encode(&self) -> String {
        [
            encode_field(&self.sender.id().raw().to_string()),
            encode_field(&self.subject),
            encode_field(&self.body),
            encode_field(&self.timestamp.to_string()),
        ]
        .join(&FIELD_SEPARATOR.to_string())
    }

    /// Decode one mailbox segment, resolving the sender through `host`.
    ///
    /// Parts beyond the fourth are ignored.
    ///
    /// # Errors
    ///
    /// - [`MailError::Malformed`] if fewer than four parts are present.
    /// - [`MailError::BadField`] if a part does not decode.
    /// - [`MailError::SenderNotFound`] if the sender is no longer live.
    pub fn decode(segment: &str, host: &Rc<dyn Host>) -> Result<Self, MailError> {
        let parts: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
        let [sender, subject, body, timestamp, ..] = parts.as_slice() else {
            return Err(MailError::Malformed(segment.to_string()));
        };

        let sender_id = decode_field("sender", sender)?
            .parse::<u64>()
            .map(EntityId)
            .map_err(|e| MailError::BadField {
                field: "sender",
                reason: e.to_string(),
            })?;
        if !host.is_live(sender_id) {
            return Err(MailError::SenderNotFound(sender_id));
        }

        let timestamp = decode_field("timestamp", timestamp)?
            .parse::<u64>()
            .map_err(|e| MailError::BadField {
                field: "timestamp",
                reason: e.to_string(),
            })?;

        Ok(Self {
            sender: Entity::new(sender_id, host.clone()),
            subject: decode_field("subject", subject)?,
            body: decode_field("body", body)?,
            timestamp,
        })
    }
}
