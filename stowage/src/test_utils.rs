//! Test utilities for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::migration::{MigrationErrorEvent, MigrationObserver, MigrationProgress};
use crate::primitives::{
    Collection, DestinationRecord, DestinationStore, DestinationStoreError, LegacyStore,
    LegacyStoreError,
};

/// Ordered in-memory legacy store. Keys enumerate in insertion order.
#[derive(Default)]
pub struct InMemoryLegacyStore {
    entries: Mutex<Vec<(String, String)>>,
    fail_enumeration: AtomicBool,
    fail_removals: AtomicBool,
}

impl InMemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store.insert(key, value);
        }
        store
    }

    /// Inserts or replaces `key`, keeping its position when it already exists.
    pub fn insert(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Makes `length` and `key` fail, as a store without access permission would.
    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    fn check_enumeration(&self) -> Result<(), LegacyStoreError> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(LegacyStoreError::ReadFailure(
                "Storage access error".to_string(),
            ));
        }
        Ok(())
    }
}

impl LegacyStore for InMemoryLegacyStore {
    fn get_item(&self, key: String) -> Result<Option<String>, LegacyStoreError> {
        Ok(self.get(&key))
    }

    fn set_item(&self, key: String, value: String) -> Result<(), LegacyStoreError> {
        self.insert(&key, &value);
        Ok(())
    }

    fn remove_item(&self, key: String) -> Result<(), LegacyStoreError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(LegacyStoreError::UpdateFailure(format!(
                "cannot remove {key}"
            )));
        }
        self.entries
            .lock()
            .unwrap()
            .retain(|(existing, _)| *existing != key);
        Ok(())
    }

    fn key(&self, index: u32) -> Result<Option<String>, LegacyStoreError> {
        self.check_enumeration()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(index as usize)
            .map(|(key, _)| key.clone()))
    }

    fn length(&self) -> Result<u32, LegacyStoreError> {
        self.check_enumeration()?;
        Ok(u32::try_from(self.entries.lock().unwrap().len()).unwrap())
    }
}

/// In-memory destination store with fault injection.
#[derive(Default)]
pub struct InMemoryDestinationStore {
    collections: Mutex<HashMap<Collection, Vec<(String, DestinationRecord)>>>,
    next_id: AtomicU64,
    successful_adds: AtomicUsize,
    rejected_keys: Mutex<HashSet<String>>,
    corrupted_values: Mutex<HashMap<String, String>>,
    unavailable_after: Mutex<Option<usize>>,
    fail_deletes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryDestinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every write of the record migrated from `legacy_key`.
    pub fn reject_key(&self, legacy_key: &str) {
        self.rejected_keys
            .lock()
            .unwrap()
            .insert(legacy_key.to_string());
    }

    /// Stores `value` instead of the migrated value for `legacy_key`.
    pub fn corrupt_value(&self, legacy_key: &str, value: &str) {
        self.corrupted_values
            .lock()
            .unwrap()
            .insert(legacy_key.to_string(), value.to_string());
    }

    /// Fails every write with `Unavailable` once `successful` writes went through.
    pub fn unavailable_after(&self, successful: usize) {
        *self.unavailable_after.lock().unwrap() = Some(successful);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Stores `record` directly, bypassing fault injection.
    pub fn insert_raw(&self, record: DestinationRecord) -> String {
        let id = self.allocate_id(record.collection());
        self.collections
            .lock()
            .unwrap()
            .entry(record.collection())
            .or_default()
            .push((id.clone(), record));
        id
    }

    pub fn records(&self, collection: Collection) -> Vec<DestinationRecord> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map(|records| records.iter().map(|(_, record)| record.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.records(collection).len()
    }

    pub fn total(&self) -> usize {
        Collection::ALL.iter().map(|c| self.len(*c)).sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn allocate_id(&self, collection: Collection) -> String {
        format!("{collection}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn try_add(&self, record: DestinationRecord) -> Result<String, DestinationStoreError> {
        if let Some(limit) = *self.unavailable_after.lock().unwrap() {
            if self.successful_adds.load(Ordering::SeqCst) >= limit {
                return Err(DestinationStoreError::Unavailable {
                    reason: "database connection closed".to_string(),
                });
            }
        }
        if self.rejected_keys.lock().unwrap().contains(record.key()) {
            return Err(DestinationStoreError::WriteRejected {
                reason: format!("constraint failed for {}", record.key()),
            });
        }
        let corrupted = self.corrupted_values.lock().unwrap().get(record.key()).cloned();
        let record = match corrupted {
            Some(value) => with_value(record, value),
            None => record,
        };
        self.successful_adds.fetch_add(1, Ordering::SeqCst);
        Ok(self.insert_raw(record))
    }
}

fn with_value(record: DestinationRecord, value: String) -> DestinationRecord {
    match record {
        DestinationRecord::Token {
            key,
            token_type,
            created_at,
            expired_at,
            ..
        } => DestinationRecord::Token {
            key,
            value,
            token_type,
            created_at,
            expired_at,
        },
        DestinationRecord::Preference { key, updated_at, .. } => DestinationRecord::Preference {
            key,
            value,
            updated_at,
        },
        DestinationRecord::Setting { key, updated_at, .. } => DestinationRecord::Setting {
            key,
            value,
            updated_at,
        },
        DestinationRecord::Cache { key, cached_at, .. } => DestinationRecord::Cache {
            key,
            value,
            cached_at,
        },
        DestinationRecord::Generic {
            key, migrated_at, ..
        } => DestinationRecord::Generic {
            key,
            value,
            migrated_at,
        },
    }
}

#[async_trait::async_trait]
impl DestinationStore for InMemoryDestinationStore {
    async fn add(
        &self,
        collection: Collection,
        record: DestinationRecord,
    ) -> Result<String, DestinationStoreError> {
        assert_eq!(collection, record.collection());

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let result = self.try_add(record);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn to_array(
        &self,
        collection: Collection,
    ) -> Result<Vec<DestinationRecord>, DestinationStoreError> {
        Ok(self.records(collection))
    }

    async fn count(&self, collection: Collection) -> Result<u64, DestinationStoreError> {
        Ok(self.len(collection) as u64)
    }

    async fn delete(
        &self,
        collection: Collection,
        key: String,
    ) -> Result<(), DestinationStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DestinationStoreError::Unavailable {
                reason: "transaction aborted".to_string(),
            });
        }
        let mut collections = self.collections.lock().unwrap();
        let records = collections.entry(collection).or_default();
        let before = records.len();
        records.retain(|(id, _)| *id != key);
        if records.len() == before {
            return Err(DestinationStoreError::NotFound { key });
        }
        Ok(())
    }
}

/// Observer that records every notification.
#[derive(Default)]
pub struct RecordingObserver {
    progress: Mutex<Vec<MigrationProgress>>,
    errors: Mutex<Vec<MigrationErrorEvent>>,
}

impl RecordingObserver {
    pub fn progress(&self) -> Vec<MigrationProgress> {
        self.progress.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<MigrationErrorEvent> {
        self.errors.lock().unwrap().clone()
    }
}

impl MigrationObserver for RecordingObserver {
    fn on_progress(&self, progress: MigrationProgress) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_error(&self, error: MigrationErrorEvent) {
        self.errors.lock().unwrap().push(error);
    }
}
