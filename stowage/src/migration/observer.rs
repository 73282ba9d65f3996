use super::state::{MigrationErrorEvent, MigrationProgress};

/// Receives progress and error notifications of a migration run. Implemented by the host.
///
/// Calls are fire-and-forget and happen on the task driving the run, so implementations
/// should return quickly.
#[uniffi::export(with_foreign)]
pub trait MigrationObserver: Send + Sync {
    /// Called after the scan, once per written item, and once at the end of the run.
    fn on_progress(&self, progress: MigrationProgress);

    /// Called once per caught fault.
    fn on_error(&self, error: MigrationErrorEvent);
}
