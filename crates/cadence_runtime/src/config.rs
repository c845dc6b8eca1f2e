//! Runtime configuration.

use std::path::Path;

use cadence_entity::EntityId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RuntimeError;

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// The entity whose name field serves as this runtime's mailbox.
    pub owner: EntityId,
    /// Minimum milliseconds between full cycles for
    /// [`Runtime::tick_default`](crate::Runtime::tick_default). `0` never
    /// throttles.
    pub min_interval_ms: u64,
    /// Re-enumerate host entities on every reset.
    pub refresh_on_reset: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            owner: EntityId::INVALID,
            min_interval_ms: 0,
            refresh_on_reset: true,
        }
    }
}

impl RuntimeConfig {
    /// Create a config for a runtime owned by `owner`.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    /// Override the default throttle interval.
    #[must_use]
    pub fn with_min_interval(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    /// Override whether resets refresh the entity set.
    #[must_use]
    pub fn with_refresh_on_reset(mut self, refresh: bool) -> Self {
        self.refresh_on_reset = refresh;
        self
    }

    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the document is not valid.
    pub fn from_json_str(json: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(json).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Io`] if the file cannot be read, or
    /// [`RuntimeError::Config`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), owner = config.owner.raw(), "loaded runtime configuration");
        Ok(config)
    }
}
