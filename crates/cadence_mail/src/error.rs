//! Mailbox protocol error types.

use cadence_entity::{EntityId, HostError};

/// Errors that can occur while posting or reading mailbox messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MailError {
    /// A mailbox segment did not split into the four encoded fields.
    #[error("malformed message segment: {0:?}")]
    Malformed(String),

    /// The decoded sender no longer resolves to a live entity.
    #[error("sender {0} not found")]
    SenderNotFound(EntityId),

    /// A field was not valid encoded text, or did not parse as its type.
    #[error("bad {field} field: {reason}")]
    BadField {
        /// Which field failed (`sender`, `subject`, `body`, `timestamp`).
        field: &'static str,
        /// Why it failed.
        reason: String,
    },

    /// The host rejected a name read or write.
    #[error("host error: {0}")]
    Host(#[from] HostError),
}
