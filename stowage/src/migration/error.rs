use crate::primitives::{DestinationStoreError, LegacyStoreError};

/// Errors that can occur during migration operations
#[crate::stowage_error]
pub enum MigrationError {
    /// An invalid operation was attempted, e.g. a second run while one is in flight
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The supplied configuration is malformed
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// The legacy store could not be enumerated
    #[error("Scan failed: {message}")]
    ScanFailed {
        /// Error reported by the scan
        message: String,
    },

    /// Destination store operation failed
    #[error(transparent)]
    Destination(#[from] DestinationStoreError),

    /// Legacy store operation failed
    #[error(transparent)]
    LegacyStore(#[from] LegacyStoreError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {message}")]
    Json {
        /// The error message from `serde_json`
        message: String,
    },
}

impl From<serde_json::Error> for MigrationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

impl MigrationError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn already_running() -> Self {
        Self::InvalidOperation(
            "Migration is already in progress. Please wait for the current migration to complete."
                .to_string(),
        )
    }
}
