//! Collaborators provided by the host application, and logging.
//!
//! Both stores are injected into the scanner and the migration service rather than
//! reached through process-wide state, so tests substitute in-memory fakes.

/// The synchronous, string-only store being migrated away from.
pub mod legacy_store;

/// The asynchronous, collection-based store being migrated to.
pub mod destination_store;

/// Forwarding of `log` records to a host-provided logger.
pub mod logger;

pub use destination_store::{
    Collection, DestinationRecord, DestinationStore, DestinationStoreError, TokenType,
};
pub use legacy_store::{LegacyStore, LegacyStoreError};
