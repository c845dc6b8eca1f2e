//! Runtime error types.

use cadence_entity::{HostError, QueryError};
use cadence_mail::MailError;

/// Errors raised by the runtime or by registered actions.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// An entity query assertion or pattern failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Posting or reading a mailbox failed.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// The host rejected an entity access.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The configuration document is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A registered action reported a failure of its own.
    #[error("action failed: {0}")]
    Action(String),
}

/// What every registered action returns.
pub type ActionResult = Result<(), RuntimeError>;
