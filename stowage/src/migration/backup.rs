use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::MigrationError;
use crate::scanner::LegacyItem;
use crate::validator::{generate_checksum, verify_checksum, ItemValue};

/// Format version written into every backup.
pub const LEGACY_BACKUP_VERSION: &str = "1.0.0";

/// One backed-up legacy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct BackupEntry {
    /// Legacy key
    pub key: String,
    /// Raw legacy value
    pub value: String,
    /// Checksum of `value`, checked when the backup is parsed
    pub checksum: String,
}

/// Summary of a backup's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct BackupMetadata {
    /// Number of entries
    pub item_count: u32,
    /// Summed size of the entries, in bytes
    pub total_size: u64,
}

/// Copy of the legacy entries a run was about to migrate, taken before any write.
///
/// Restoring writes the entries back to the legacy store; it never clears other keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct LegacyBackup {
    /// Format version, see [`LEGACY_BACKUP_VERSION`]
    pub version: String,
    /// RFC 3339 capture time
    pub created_at: String,
    /// Entries in scan order
    pub entries: Vec<BackupEntry>,
    /// Entry count and size
    pub metadata: BackupMetadata,
}

impl LegacyBackup {
    /// Captures the given scanned items.
    #[must_use]
    pub fn capture(items: &[LegacyItem]) -> Self {
        let entries = items
            .iter()
            .map(|item| BackupEntry {
                key: item.key.clone(),
                value: item.value.clone(),
                checksum: generate_checksum(&ItemValue::from(item.value.as_str())),
            })
            .collect::<Vec<_>>();
        Self {
            version: LEGACY_BACKUP_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339(),
            metadata: BackupMetadata {
                item_count: u32::try_from(entries.len()).unwrap_or(u32::MAX),
                total_size: items.iter().map(|item| item.size).sum(),
            },
            entries,
        }
    }

    /// Serializes the backup as pretty-printed JSON.
    ///
    /// # Errors
    /// Fails if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serialize LegacyBackup")
    }

    /// Parses and checks a backup produced by [`Self::to_json`].
    ///
    /// # Errors
    /// Fails on malformed JSON, an unknown version, a bad timestamp, a metadata count that
    /// disagrees with the entries, or an entry whose checksum does not match its value.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let backup: Self = serde_json::from_str(json).context("parse LegacyBackup")?;
        backup.verify()?;
        Ok(backup)
    }

    /// Checks the version, timestamp, metadata count and every entry checksum.
    ///
    /// # Errors
    /// Fails on the first check that does not hold.
    pub fn verify(&self) -> anyhow::Result<()> {
        ensure!(
            self.version == LEGACY_BACKUP_VERSION,
            "unsupported backup version {}",
            self.version
        );
        DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("parse backup timestamp {}", self.created_at))?;
        ensure!(
            self.metadata.item_count as usize == self.entries.len(),
            "backup metadata lists {} items but {} entries are present",
            self.metadata.item_count,
            self.entries.len()
        );
        for entry in &self.entries {
            ensure!(
                verify_checksum(&ItemValue::from(entry.value.as_str()), &entry.checksum),
                "checksum mismatch for backed up key '{}'",
                entry.key
            );
        }
        Ok(())
    }
}

/// Parses a backup exported by `MigrationService::export_backup`.
///
/// # Errors
/// - `MigrationError::Generic` if the JSON is malformed, the version is unsupported or an
///   entry fails its checksum
#[uniffi::export]
pub fn parse_legacy_backup(json: &str) -> Result<LegacyBackup, MigrationError> {
    Ok(LegacyBackup::from_json(json)?)
}
