//! Migration of a legacy key-value store into a collection-based store.
//!
//! # Overview
//!
//! - [`MigrationService`]: drives scan, batched writes, validation, cleanup and rollback
//! - [`MigrationConfig`]: per-instance settings, updated with [`MigrationConfigUpdate`]
//! - [`MigrationObserver`]: host-implemented sink for progress and error events
//! - [`LegacyBackup`]: copy of the legacy entries taken before a run writes anything
//!
//! Each scanned item is written into the collection of its category:
//!
//! | category      | collection        | record                          |
//! |---------------|-------------------|---------------------------------|
//! | `Tokens`      | `tokens`          | `Token` (access or refresh)     |
//! | `Preferences` | `userPreferences` | `Preference`                    |
//! | `Settings`    | `appSettings`     | `Setting`                       |
//! | `Cache`       | `apiCache`        | `Cache`                         |
//! | `Other`       | `generic`         | `Generic`                       |
//!
//! # Usage
//!
//! ```swift
//! let service = try MigrationService(
//!     legacy: UserDefaultsLegacyStore(),
//!     destination: CoreDataDestinationStore(),
//!     config: nil,
//!     observer: progressView
//! )
//!
//! let result = try await service.migrateAllData()
//! if !result.success {
//!     let rollback = try await service.rollbackMigration()
//! }
//! ```
//!
//! ```kotlin
//! val service = MigrationService(
//!     SharedPreferencesLegacyStore(prefs),
//!     RoomDestinationStore(db),
//!     MigrationConfig(batchSize = 20u, enableBackup = true, validateData = true,
//!         cleanupAfterMigration = false, excludeKeys = listOf(), excludePatterns = listOf("debug_*")),
//!     observer,
//! )
//! val result = service.migrateAllData()
//! ```
//!
//! # Cleanup and rollback
//!
//! Legacy keys are only removed when `cleanup_after_migration` is set and the run had no
//! errors at all. Rollback deletes the destination records of the last run but never
//! writes to the legacy store, so keys removed by cleanup only come back through
//! [`MigrationService::restore_legacy_backup`].

mod backup;
mod config;
mod error;
mod observer;
mod records;
mod service;
mod state;


pub use backup::{
    parse_legacy_backup, BackupEntry, BackupMetadata, LegacyBackup, LEGACY_BACKUP_VERSION,
};
pub use config::{MigrationConfig, MigrationConfigUpdate, DEFAULT_BATCH_SIZE};
pub use error::MigrationError;
pub use observer::MigrationObserver;
pub use service::MigrationService;
pub use state::{
    MigrationErrorEvent, MigrationPhase, MigrationProgress, MigrationResult, MigrationStatus,
    MigrationValidationReport, ProgressPhase, RollbackResult,
};
