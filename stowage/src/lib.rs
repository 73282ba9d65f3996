#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

//! `stowage` migrates a flat, synchronous, string-only key-value store (`localStorage`,
//! `SharedPreferences`, `UserDefaults`) into a structured, asynchronous, collection-based
//! store, without losing the meaning of any value.
//!
//! Migration is non-destructive by default: legacy data stays in place unless cleanup is
//! enabled, and every record written by the last run can be removed again. Both stores are
//! provided by the host application through foreign traits.

pub use stowage_macros::{stowage_error, stowage_export};

/// Collaborator traits implemented by the host application, and logging.
pub mod primitives;

/// Enumerates and classifies the contents of the legacy store.
pub mod scanner;

/// Compares original and migrated values, and computes checksums.
pub mod validator;

/// Drives a migration run: scan, batched writes, validation, cleanup and rollback.
///
/// See [`migration::MigrationService`].
pub mod migration;

#[cfg(test)]
mod test_utils;

uniffi::setup_scaffolding!("stowage");
