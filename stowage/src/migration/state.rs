use serde::{Deserialize, Serialize};

/// Phase of a [`MigrationService`](super::MigrationService).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum MigrationPhase {
    /// No run has started yet
    #[default]
    Idle,
    /// Reading the legacy store
    Scanning,
    /// Writing batches into the destination store
    Migrating,
    /// Reading written records back for comparison
    Validating,
    /// Removing migrated keys from the legacy store
    Cleanup,
    /// The last run finished, with or without item errors
    Completed,
    /// The last run was aborted by a scan or store failure
    Error,
}

impl MigrationPhase {
    /// Whether a run is executing in this phase.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Scanning | Self::Migrating | Self::Validating | Self::Cleanup
        )
    }

    /// Lowercase name, as used in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Migrating => "migrating",
            Self::Validating => "validating",
            Self::Cleanup => "cleanup",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the service's run state
#[derive(Clone, Debug, Default, PartialEq, Eq, uniffi::Record)]
pub struct MigrationStatus {
    /// Current phase
    pub phase: MigrationPhase,
    /// Whether a run is executing
    pub is_in_progress: bool,
    /// Whether the last run reached `Completed`
    pub is_completed: bool,
    /// Items found by the current or last run's scan
    pub total_items: u32,
    /// Items written by the current or last run
    pub processed_items: u32,
}

/// Phase reported in a progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum ProgressPhase {
    /// The scan finished
    Scanning,
    /// An item was written
    Migrating,
    /// Validation finished; final event of a validating run
    Validation,
    /// Final event of a run without validation
    Done,
}

/// A progress notification.
///
/// Within one run `processed_items` never decreases. Only the final event has
/// `is_completed = true`.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct MigrationProgress {
    /// What the run is doing
    pub phase: ProgressPhase,
    /// Items written so far
    pub processed_items: u32,
    /// Items in the working set
    pub total_items: u32,
    /// Set on the final event of a run
    pub is_completed: bool,
    /// Key of the item that was just written, for `Migrating` events
    pub current_key: Option<String>,
}

/// Outcome of a migration run
#[derive(Clone, Debug, Default, PartialEq, Eq, uniffi::Record)]
pub struct MigrationResult {
    /// `true` exactly when `errors` is empty
    pub success: bool,
    /// Items written to the destination store
    pub total_processed: u32,
    /// Item, validation, cleanup and store errors, in the order they occurred
    pub errors: Vec<String>,
}

/// Independent comparison of the legacy store with the destination store
#[derive(Clone, Debug, Default, PartialEq, Eq, uniffi::Record)]
pub struct MigrationValidationReport {
    /// No item is missing or mismatched
    pub is_valid: bool,
    /// Legacy items compared
    pub total_items: u32,
    /// Items present in the destination with an equivalent value
    pub valid_items: u32,
    /// Keys with no record in the destination
    pub missing_items: Vec<String>,
    /// Keys whose record holds a different value
    pub mismatched_items: Vec<String>,
}

/// Outcome of a rollback
#[derive(Clone, Debug, Default, PartialEq, Eq, uniffi::Record)]
pub struct RollbackResult {
    /// Every tracked record is gone from the destination
    pub success: bool,
    /// Records deleted by this call
    pub deleted_items: u32,
    /// Deletions that failed; those records stay tracked for the next attempt
    pub errors: Vec<String>,
}

/// Context handed to [`MigrationObserver::on_error`](super::MigrationObserver::on_error)
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct MigrationErrorEvent {
    /// Legacy key involved, if the fault concerns a single item
    pub key: Option<String>,
    /// Phase in which the fault happened
    pub phase: MigrationPhase,
    /// Error message
    pub message: String,
}

/// Mutable run state behind the service's status lock.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub phase: MigrationPhase,
    pub total_items: u32,
    pub processed_items: u32,
}

impl RunState {
    pub(crate) fn status(&self) -> MigrationStatus {
        MigrationStatus {
            phase: self.phase,
            is_in_progress: self.phase.is_active(),
            is_completed: self.phase == MigrationPhase::Completed,
            total_items: self.total_items,
            processed_items: self.processed_items,
        }
    }
}
