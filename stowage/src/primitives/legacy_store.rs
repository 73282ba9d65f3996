use thiserror::Error;

/// Errors raised by the host's legacy store.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum LegacyStoreError {
    /// The store could not be read (e.g. storage access denied).
    #[error("failed to read legacy store: {0}")]
    ReadFailure(String),
    /// The store rejected a write or removal.
    #[error("failed to update legacy store: {0}")]
    UpdateFailure(String),
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

/// Lets an exception thrown by the native implementation surface as a
/// `LegacyStoreError` instead of a panic.
impl From<uniffi::UnexpectedUniFFICallbackError> for LegacyStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// The flat, synchronous, string-only store being migrated away from.
///
/// On the web this is `localStorage`; on Android `SharedPreferences` and on iOS
/// `UserDefaults` have the same shape. Only strings are stored. Structured values were
/// historically written as JSON text.
///
/// Keys are enumerated by index: `key(i)` for `i` in `0..length()`. The order is whatever
/// the native store reports and is preserved by the scanner.
#[uniffi::export(with_foreign)]
pub trait LegacyStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when the key is absent.
    ///
    /// # Errors
    /// - `LegacyStoreError::ReadFailure` if the store cannot be read
    fn get_item(&self, key: String) -> Result<Option<String>, LegacyStoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// - `LegacyStoreError::UpdateFailure` if the write is rejected
    fn set_item(&self, key: String, value: String) -> Result<(), LegacyStoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// - `LegacyStoreError::UpdateFailure` if the removal is rejected
    fn remove_item(&self, key: String) -> Result<(), LegacyStoreError>;

    /// Returns the key at `index`, or `None` when out of range.
    ///
    /// # Errors
    /// - `LegacyStoreError::ReadFailure` if the store cannot be enumerated
    fn key(&self, index: u32) -> Result<Option<String>, LegacyStoreError>;

    /// Number of keys currently stored.
    ///
    /// # Errors
    /// - `LegacyStoreError::ReadFailure` if the store cannot be enumerated
    fn length(&self) -> Result<u32, LegacyStoreError>;
}
