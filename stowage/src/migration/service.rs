use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use futures::future::join_all;

use super::backup::LegacyBackup;
use super::config::{MigrationConfig, MigrationConfigUpdate};
use super::error::MigrationError;
use super::observer::MigrationObserver;
use super::records::record_for;
use super::state::{
    MigrationErrorEvent, MigrationPhase, MigrationProgress, MigrationResult, MigrationStatus,
    MigrationValidationReport, ProgressPhase, RollbackResult, RunState,
};
use crate::primitives::{Collection, DestinationStore, DestinationStoreError, LegacyStore};
use crate::scanner::{LegacyDataScanner, LegacyItem, ScanResult};
use crate::stowage_export;
use crate::validator::{DataValidator, ItemValue, MigrationItem};

/// A record written by the last run, tracked for rollback.
#[derive(Debug, Clone)]
struct LedgerEntry {
    legacy_key: String,
    collection: Collection,
    destination_key: String,
}

/// Stored values keyed by collection and legacy key.
type StoredValues = HashMap<(Collection, String), String>;

/// Moves the contents of a [`LegacyStore`] into a [`DestinationStore`].
///
/// A run scans the legacy store, writes every item into the collection of its category
/// in batches of `batch_size`, optionally reads the records back to validate them, and
/// optionally removes the migrated keys from the legacy store. Legacy data is left in place
/// by default, and every record written by the last run can be removed again with
/// [`MigrationService::rollback_migration`].
///
/// # Concurrency
///
/// At most one run, rollback or restore executes per instance. A second caller fails
/// immediately with `MigrationError::InvalidOperation` instead of waiting.
#[derive(uniffi::Object)]
pub struct MigrationService {
    legacy: Arc<dyn LegacyStore>,
    destination: Arc<dyn DestinationStore>,
    scanner: LegacyDataScanner,
    config: RwLock<MigrationConfig>,
    observer: RwLock<Option<Arc<dyn MigrationObserver>>>,
    run_lock: tokio::sync::Mutex<()>,
    state: Mutex<RunState>,
    ledger: Mutex<Vec<LedgerEntry>>,
    backup: Mutex<Option<LegacyBackup>>,
}

#[stowage_export]
impl MigrationService {
    /// Creates a service over the two stores. `config` defaults to
    /// [`MigrationConfig::default`].
    ///
    /// # Errors
    /// - `MigrationError::Configuration` if `config` is malformed
    #[uniffi::constructor]
    pub fn new(
        legacy: Arc<dyn LegacyStore>,
        destination: Arc<dyn DestinationStore>,
        config: Option<MigrationConfig>,
        observer: Option<Arc<dyn MigrationObserver>>,
    ) -> Result<Arc<Self>, MigrationError> {
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(Arc::new(Self {
            scanner: LegacyDataScanner::new(Arc::clone(&legacy)),
            legacy,
            destination,
            config: RwLock::new(config),
            observer: RwLock::new(observer),
            run_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(RunState::default()),
            ledger: Mutex::new(Vec::new()),
            backup: Mutex::new(None),
        }))
    }

    /// Migrates every non-excluded legacy item.
    ///
    /// Item failures are collected into [`MigrationResult::errors`] and do not stop the run.
    /// A destination store that becomes unavailable aborts the run with one aggregated
    /// error; `total_processed` still counts the items written before the fault.
    ///
    /// # Errors
    /// - `MigrationError::InvalidOperation` if a run, rollback or restore is in progress
    pub async fn migrate_all_data(&self) -> Result<MigrationResult, MigrationError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| MigrationError::already_running())?;

        Ok(self.run().await)
    }

    /// Re-scans the legacy store and compares it with the destination store.
    ///
    /// Keys with no destination record are reported as missing, keys whose record holds a
    /// different value as mismatched.
    ///
    /// # Errors
    /// - `MigrationError::ScanFailed` if the legacy store cannot be enumerated
    /// - `MigrationError::Destination` if a collection cannot be read
    pub async fn validate_migration(&self) -> Result<MigrationValidationReport, MigrationError> {
        let scan = self.scanner.scan(&self.get_config().scan_options());
        if let Some(message) = scan.error {
            return Err(MigrationError::ScanFailed { message });
        }

        let stored = self.read_back(&scan.items).await?;
        let validator = DataValidator::new();
        let mut report = MigrationValidationReport {
            total_items: scan.total_items,
            ..MigrationValidationReport::default()
        };

        for item in &scan.items {
            match stored.get(&(item.category.collection(), item.key.clone())) {
                None => report.missing_items.push(item.key.clone()),
                Some(value) => {
                    let result = validator.validate_item(
                        &item.key,
                        Some(&ItemValue::from(item.value.as_str())),
                        Some(&ItemValue::from(value.as_str())),
                        None,
                    );
                    if result.is_valid {
                        report.valid_items += 1;
                    } else {
                        report.mismatched_items.push(item.key.clone());
                    }
                }
            }
        }
        report.is_valid = report.missing_items.is_empty() && report.mismatched_items.is_empty();

        crate::info!(
            "migration_validation.completed total={} valid={} missing={} mismatched={} timestamp={}",
            report.total_items,
            report.valid_items,
            report.missing_items.len(),
            report.mismatched_items.len(),
            Utc::now().to_rfc3339()
        );

        Ok(report)
    }

    /// Deletes every record written by the last run.
    ///
    /// Records that were deleted (or were already gone) stop being tracked, so calling this
    /// again is a successful no-op. Failed deletions stay tracked for the next call. Legacy
    /// keys removed by cleanup are not restored; use
    /// [`MigrationService::restore_legacy_backup`] for that.
    ///
    /// # Errors
    /// - `MigrationError::InvalidOperation` if a run, rollback or restore is in progress
    pub async fn rollback_migration(&self) -> Result<RollbackResult, MigrationError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| MigrationError::already_running())?;

        let entries = self.ledger().clone();
        let batch_len = self.get_config().batch_len();
        let observer = self.current_observer();
        let phase = self.state().phase;
        let mut remaining = Vec::new();
        let mut result = RollbackResult::default();

        for batch in entries.chunks(batch_len) {
            let outcomes = join_all(batch.iter().map(|entry| {
                self.destination
                    .delete(entry.collection, entry.destination_key.clone())
            }))
            .await;

            for (entry, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(()) => result.deleted_items += 1,
                    Err(DestinationStoreError::NotFound { .. }) => {}
                    Err(e) => {
                        let message = format!(
                            "Failed to roll back '{}' from {}: {e}",
                            entry.legacy_key, entry.collection
                        );
                        Self::report_error(
                            observer.as_ref(),
                            Some(&entry.legacy_key),
                            phase,
                            &message,
                        );
                        result.errors.push(message);
                        remaining.push(entry.clone());
                    }
                }
            }
        }

        *self.ledger() = remaining;
        result.success = result.errors.is_empty();

        crate::info!(
            "migration_rollback.completed tracked={} deleted={} failed={} timestamp={}",
            entries.len(),
            result.deleted_items,
            result.errors.len(),
            Utc::now().to_rfc3339()
        );

        Ok(result)
    }

    /// Returns a snapshot of the run state.
    #[must_use]
    pub fn get_migration_status(&self) -> MigrationStatus {
        self.state().status()
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn get_config(&self) -> MigrationConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `update` on top of the current configuration. A running migration keeps the
    /// configuration it started with.
    ///
    /// # Errors
    /// - `MigrationError::Configuration` if the merged configuration is malformed; the
    ///   current configuration is then left unchanged
    pub fn update_config(&self, update: MigrationConfigUpdate) -> Result<(), MigrationError> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let merged = config.merged(update);
        merged.validate()?;
        *config = merged;
        Ok(())
    }

    /// Replaces the observer. `None` silences notifications.
    pub fn set_observer(&self, observer: Option<Arc<dyn MigrationObserver>>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// Scans the legacy store with the configured exclusions.
    #[must_use]
    pub fn scan_legacy_data(&self) -> ScanResult {
        self.scanner.scan(&self.get_config().scan_options())
    }

    /// Number of destination records the next rollback would delete.
    #[must_use]
    pub fn tracked_records(&self) -> u32 {
        u32::try_from(self.ledger().len()).unwrap_or(u32::MAX)
    }

    /// The backup captured by the last run with `enable_backup`, if any.
    #[must_use]
    pub fn last_backup(&self) -> Option<LegacyBackup> {
        self.backup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Serializes the last captured backup as pretty-printed JSON.
    ///
    /// # Errors
    /// - `MigrationError::Generic` if the backup cannot be serialized
    pub fn export_backup(&self) -> Result<Option<String>, MigrationError> {
        Ok(self
            .last_backup()
            .map(|backup| backup.to_json())
            .transpose()?)
    }

    /// Writes the entries of `backup` (or of the last captured backup) back into the
    /// legacy store and returns how many were written. Keys not in the backup are left alone.
    ///
    /// # Errors
    /// - `MigrationError::InvalidOperation` if a run or rollback is in progress, or no
    ///   backup is available
    /// - `MigrationError::Generic` if the backup fails its integrity checks; nothing is
    ///   written then
    /// - `MigrationError::LegacyStore` if a write is rejected; earlier entries stay written
    pub fn restore_legacy_backup(
        &self,
        backup: Option<LegacyBackup>,
    ) -> Result<u32, MigrationError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| MigrationError::already_running())?;

        let backup = backup.or_else(|| self.last_backup()).ok_or_else(|| {
            MigrationError::InvalidOperation("No legacy backup is available".to_string())
        })?;
        backup.verify()?;

        let mut restored = 0_u32;
        for entry in &backup.entries {
            self.legacy.set_item(entry.key.clone(), entry.value.clone())?;
            restored += 1;
        }

        crate::info!(
            "legacy_backup.restored entries={} created_at={} timestamp={}",
            restored,
            backup.created_at,
            Utc::now().to_rfc3339()
        );

        Ok(restored)
    }
}

impl MigrationService {
    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ledger(&self) -> MutexGuard<'_, Vec<LedgerEntry>> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rollback covers the last run that wrote anything. A run that wrote nothing leaves
    /// the tracked records of the previous one in place.
    fn commit_ledger(&self, run_ledger: Vec<LedgerEntry>) {
        if !run_ledger.is_empty() {
            *self.ledger() = run_ledger;
        }
    }

    fn set_phase(&self, phase: MigrationPhase) {
        self.state().phase = phase;
    }

    fn current_observer(&self) -> Option<Arc<dyn MigrationObserver>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(observer: Option<&Arc<dyn MigrationObserver>>, progress: MigrationProgress) {
        if let Some(observer) = observer {
            observer.on_progress(progress);
        }
    }

    fn report_error(
        observer: Option<&Arc<dyn MigrationObserver>>,
        key: Option<&str>,
        phase: MigrationPhase,
        message: &str,
    ) {
        crate::warn!(
            "migration.error phase={} key={} message={} timestamp={}",
            phase,
            key.unwrap_or("-"),
            message,
            Utc::now().to_rfc3339()
        );
        if let Some(observer) = observer {
            observer.on_error(MigrationErrorEvent {
                key: key.map(ToString::to_string),
                phase,
                message: message.to_string(),
            });
        }
    }

    /// Executes one run. The caller holds the run lock.
    #[allow(clippy::too_many_lines)]
    async fn run(&self) -> MigrationResult {
        let run_start_time = Utc::now();
        let config = self.get_config();
        let observer = self.current_observer();

        *self.state() = RunState {
            phase: MigrationPhase::Scanning,
            ..RunState::default()
        };

        crate::info!(
            "migration_run.started batch_size={} validate_data={} cleanup={} backup={} timestamp={}",
            config.batch_size,
            config.validate_data,
            config.cleanup_after_migration,
            config.enable_backup,
            run_start_time.to_rfc3339()
        );

        let scan = self.scanner.scan(&config.scan_options());
        if let Some(error) = scan.error {
            let message = format!("Scan failed: {error}");
            Self::report_error(observer.as_ref(), None, MigrationPhase::Scanning, &message);
            self.set_phase(MigrationPhase::Error);
            return MigrationResult {
                success: false,
                total_processed: 0,
                errors: vec![message],
            };
        }

        let items = scan.items;
        let total_items = scan.total_items;
        self.state().total_items = total_items;
        if total_items > 0 {
            Self::emit(
                observer.as_ref(),
                MigrationProgress {
                    phase: ProgressPhase::Scanning,
                    processed_items: 0,
                    total_items,
                    is_completed: false,
                    current_key: None,
                },
            );
        }

        if config.enable_backup {
            *self.backup.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(LegacyBackup::capture(&items));
        }

        self.set_phase(MigrationPhase::Migrating);

        let now_ms = Utc::now().timestamp_millis();
        let mut errors = Vec::new();
        let mut written: Vec<LegacyItem> = Vec::with_capacity(items.len());
        let mut run_ledger: Vec<LedgerEntry> = Vec::with_capacity(items.len());
        let mut processed = 0_u32;

        for batch in items.chunks(config.batch_len()) {
            let outcomes = join_all(batch.iter().map(|item| {
                let record = record_for(item, now_ms);
                let collection = record.collection();
                async move { (collection, self.destination.add(collection, record).await) }
            }))
            .await;

            let mut systemic: Option<DestinationStoreError> = None;
            for (item, (collection, outcome)) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(destination_key) => {
                        processed += 1;
                        run_ledger.push(LedgerEntry {
                            legacy_key: item.key.clone(),
                            collection,
                            destination_key,
                        });
                        self.state().processed_items = processed;
                        written.push(item.clone());
                        // The final event reports the last item.
                        if processed < total_items {
                            Self::emit(
                                observer.as_ref(),
                                MigrationProgress {
                                    phase: ProgressPhase::Migrating,
                                    processed_items: processed,
                                    total_items,
                                    is_completed: false,
                                    current_key: Some(item.key.clone()),
                                },
                            );
                        }
                    }
                    Err(e) if e.is_systemic() => {
                        systemic.get_or_insert(e);
                    }
                    Err(e) => {
                        let message =
                            format!("Failed to migrate '{}' into {collection}: {e}", item.key);
                        Self::report_error(
                            observer.as_ref(),
                            Some(&item.key),
                            MigrationPhase::Migrating,
                            &message,
                        );
                        errors.push(message);
                    }
                }
            }

            if let Some(e) = systemic {
                let message = format!(
                    "Migration aborted after {processed} of {total_items} items: {e}"
                );
                Self::report_error(observer.as_ref(), None, MigrationPhase::Migrating, &message);
                errors.push(message);
                self.commit_ledger(run_ledger);
                self.set_phase(MigrationPhase::Error);
                crate::error!(
                    "migration_run.aborted processed={} total={} duration_ms={} timestamp={}",
                    processed,
                    total_items,
                    (Utc::now() - run_start_time).num_milliseconds(),
                    Utc::now().to_rfc3339()
                );
                return MigrationResult {
                    success: false,
                    total_processed: processed,
                    errors,
                };
            }
        }

        self.commit_ledger(run_ledger);

        if config.validate_data {
            self.set_phase(MigrationPhase::Validating);
            match self.validate_written(&written).await {
                Ok(failures) => {
                    for (key, message) in failures {
                        Self::report_error(
                            observer.as_ref(),
                            Some(&key),
                            MigrationPhase::Validating,
                            &message,
                        );
                        errors.push(message);
                    }
                }
                Err(e) => {
                    let message = format!("Failed to read migrated records back: {e}");
                    Self::report_error(
                        observer.as_ref(),
                        None,
                        MigrationPhase::Validating,
                        &message,
                    );
                    errors.push(message);
                }
            }
        }

        if config.cleanup_after_migration && errors.is_empty() {
            self.set_phase(MigrationPhase::Cleanup);
            for item in &written {
                if let Err(e) = self.legacy.remove_item(item.key.clone()) {
                    let message = format!("Failed to remove legacy key '{}': {e}", item.key);
                    Self::report_error(
                        observer.as_ref(),
                        Some(&item.key),
                        MigrationPhase::Cleanup,
                        &message,
                    );
                    errors.push(message);
                }
            }
        }

        self.set_phase(MigrationPhase::Completed);
        Self::emit(
            observer.as_ref(),
            MigrationProgress {
                phase: if config.validate_data {
                    ProgressPhase::Validation
                } else {
                    ProgressPhase::Done
                },
                processed_items: processed,
                total_items,
                is_completed: true,
                current_key: None,
            },
        );

        crate::info!(
            "migration_run.completed total={} processed={} errors={} duration_ms={} timestamp={}",
            total_items,
            processed,
            errors.len(),
            (Utc::now() - run_start_time).num_milliseconds(),
            Utc::now().to_rfc3339()
        );

        MigrationResult {
            success: errors.is_empty(),
            total_processed: processed,
            errors,
        }
    }

    /// Reads `items` back from the destination and returns `(key, message)` per failure.
    async fn validate_written(
        &self,
        items: &[LegacyItem],
    ) -> Result<Vec<(String, String)>, DestinationStoreError> {
        let stored = self.read_back(items).await?;
        let pairs: Vec<MigrationItem> = items
            .iter()
            .map(|item| MigrationItem {
                key: item.key.clone(),
                original_value: Some(ItemValue::from(item.value.as_str())),
                migrated_value: stored
                    .get(&(item.category.collection(), item.key.clone()))
                    .map(|value| ItemValue::from(value.as_str())),
                category: item.category,
                size: item.size,
            })
            .collect();

        let batch = DataValidator::new().validate_batch(&pairs);
        Ok(batch
            .errors
            .into_iter()
            .flat_map(|failure| {
                let key = failure.key;
                failure
                    .errors
                    .into_iter()
                    .map(move |message| (key.clone(), message))
            })
            .collect())
    }

    /// Reads every collection `items` map to, once each. When a collection holds several
    /// records for one legacy key the last one wins.
    async fn read_back(
        &self,
        items: &[LegacyItem],
    ) -> Result<StoredValues, DestinationStoreError> {
        let collections: BTreeSet<Collection> =
            items.iter().map(|item| item.category.collection()).collect();

        let reads = join_all(collections.into_iter().map(|collection| async move {
            (collection, self.destination.to_array(collection).await)
        }))
        .await;

        let mut stored = StoredValues::new();
        for (collection, records) in reads {
            for record in records? {
                stored.insert(
                    (collection, record.key().to_string()),
                    record.value().to_string(),
                );
            }
        }
        Ok(stored)
    }
}
