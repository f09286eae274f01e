//! Configuration for transfer sessions

use crate::{Result, TransferError};
use serde::{Deserialize, Serialize};

/// Configuration for a [`TransferSession`](crate::TransferSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Name attached to every log record emitted by the session
    pub label: String,

    /// Create the first segment when bytes arrive before any new-page signal
    pub implicit_segment_on_write: bool,

    /// Wake a reader parked on the tail segment when the transfer ends
    pub wake_reader_on_end: bool,

    /// Report unsupported legacy stream calls to the log sink
    pub warn_on_unsupported: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            label: "transfer".to_string(),
            implicit_segment_on_write: true,
            wake_reader_on_end: true,
            warn_on_unsupported: true,
        }
    }
}

impl TransferConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable implicit segment creation on write
    #[must_use]
    pub const fn with_implicit_segment_on_write(mut self, enable: bool) -> Self {
        self.implicit_segment_on_write = enable;
        self
    }

    /// Enable or disable waking the tail reader at end of transfer
    #[must_use]
    pub const fn with_wake_reader_on_end(mut self, enable: bool) -> Self {
        self.wake_reader_on_end = enable;
        self
    }

    /// Enable or disable warnings for unsupported stream calls
    #[must_use]
    pub const fn with_warn_on_unsupported(mut self, enable: bool) -> Self {
        self.warn_on_unsupported = enable;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(TransferError::Config("label must not be empty".to_string()));
        }
        Ok(())
    }
}
