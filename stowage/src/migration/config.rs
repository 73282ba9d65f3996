use serde::{Deserialize, Serialize};

use super::error::MigrationError;
use crate::scanner::ScanOptions;

/// Default number of writes awaited together.
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Settings of a [`MigrationService`](super::MigrationService).
///
/// Held for the lifetime of the service and never persisted. Progress and error
/// notifications go through [`MigrationObserver`](super::MigrationObserver) instead of
/// callback fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct MigrationConfig {
    /// Writes awaited together per batch. Must be at least 1.
    pub batch_size: u32,
    /// Capture a [`LegacyBackup`](super::LegacyBackup) of the scanned items before writing.
    pub enable_backup: bool,
    /// Read the written records back and compare them with the originals.
    pub validate_data: bool,
    /// Remove migrated keys from the legacy store after an error-free run.
    pub cleanup_after_migration: bool,
    /// Legacy keys never migrated.
    pub exclude_keys: Vec<String>,
    /// Wildcard patterns (`*`, `?`) of legacy keys never migrated.
    pub exclude_patterns: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            enable_backup: true,
            validate_data: true,
            cleanup_after_migration: false,
            exclude_keys: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Partial update for [`MigrationConfig`]. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct MigrationConfigUpdate {
    /// New batch size.
    pub batch_size: Option<u32>,
    /// New backup flag.
    pub enable_backup: Option<bool>,
    /// New validation flag.
    pub validate_data: Option<bool>,
    /// New cleanup flag.
    pub cleanup_after_migration: Option<bool>,
    /// Replaces the excluded keys.
    pub exclude_keys: Option<Vec<String>>,
    /// Replaces the excluded patterns.
    pub exclude_patterns: Option<Vec<String>>,
}

impl MigrationConfig {
    /// Checks the configuration for programmer errors.
    ///
    /// # Errors
    /// - `MigrationError::Configuration` if `batch_size` is zero, an excluded key is empty, or an
    ///   excluded pattern is blank or contains whitespace
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.batch_size == 0 {
            return Err(MigrationError::configuration("batch_size must be at least 1"));
        }
        if self.exclude_keys.iter().any(String::is_empty) {
            return Err(MigrationError::configuration(
                "exclude_keys must not contain empty keys",
            ));
        }
        for pattern in &self.exclude_patterns {
            if pattern.trim().is_empty() {
                return Err(MigrationError::configuration(
                    "exclude_patterns must not contain blank patterns",
                ));
            }
            if pattern.chars().any(char::is_whitespace) {
                return Err(MigrationError::configuration(format!(
                    "exclude pattern '{pattern}' must not contain whitespace"
                )));
            }
        }
        Ok(())
    }

    /// Returns a copy with `update` applied on top. Does not validate.
    #[must_use]
    pub fn merged(&self, update: MigrationConfigUpdate) -> Self {
        Self {
            batch_size: update.batch_size.unwrap_or(self.batch_size),
            enable_backup: update.enable_backup.unwrap_or(self.enable_backup),
            validate_data: update.validate_data.unwrap_or(self.validate_data),
            cleanup_after_migration: update
                .cleanup_after_migration
                .unwrap_or(self.cleanup_after_migration),
            exclude_keys: update
                .exclude_keys
                .unwrap_or_else(|| self.exclude_keys.clone()),
            exclude_patterns: update
                .exclude_patterns
                .unwrap_or_else(|| self.exclude_patterns.clone()),
        }
    }

    pub(crate) fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude_keys: self.exclude_keys.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            ..ScanOptions::default()
        }
    }

    pub(crate) fn batch_len(&self) -> usize {
        usize::try_from(self.batch_size).unwrap_or(usize::MAX)
    }
}
