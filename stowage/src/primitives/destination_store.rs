use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the host's destination store.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum DestinationStoreError {
    /// A single write was rejected (constraint violation, quota, bad record).
    #[error("write rejected: {reason}")]
    WriteRejected {
        /// Reason reported by the store.
        reason: String,
    },
    /// The addressed record does not exist.
    #[error("record {key} not found")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },
    /// The store as a whole is unusable (closed, blocked, upgrade pending).
    ///
    /// Unlike the other variants this aborts a migration run.
    #[error("destination store unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the store.
        reason: String,
    },
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl DestinationStoreError {
    /// Whether the failure affects the whole store rather than a single record.
    #[must_use]
    pub const fn is_systemic(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for DestinationStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// Named collections of the destination store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, uniffi::Enum,
)]
pub enum Collection {
    /// Access and refresh tokens, API keys.
    Tokens,
    /// User preferences.
    Preferences,
    /// Application settings.
    Settings,
    /// Cached API responses and other disposable data.
    Cache,
    /// Everything that matched no other category.
    Generic,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Tokens,
        Self::Preferences,
        Self::Settings,
        Self::Cache,
        Self::Generic,
    ];

    /// Collection name as used by the host store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Preferences => "userPreferences",
            Self::Settings => "appSettings",
            Self::Cache => "apiCache",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a migrated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum TokenType {
    /// Short-lived access token or API key.
    Access,
    /// Refresh token.
    Refresh,
}

impl TokenType {
    /// Infers the token type from the legacy key name.
    #[must_use]
    pub fn infer(key: &str) -> Self {
        if key.to_ascii_lowercase().contains("refresh") {
            Self::Refresh
        } else {
            Self::Access
        }
    }
}

/// A record written to the destination store. Each variant lives in exactly one
/// [`Collection`], see [`DestinationRecord::collection`].
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum DestinationRecord {
    /// A credential.
    Token {
        /// Legacy key.
        key: String,
        /// Raw token value.
        value: String,
        /// Access or refresh.
        token_type: TokenType,
        /// When the record was migrated.
        created_at: i64,
        /// Expiry, when known.
        expired_at: Option<i64>,
    },
    /// A user preference.
    Preference {
        /// Legacy key.
        key: String,
        /// Raw value.
        value: String,
        /// When the record was migrated.
        updated_at: i64,
    },
    /// An application setting.
    Setting {
        /// Legacy key.
        key: String,
        /// Raw value.
        value: String,
        /// When the record was migrated.
        updated_at: i64,
    },
    /// A cache entry.
    Cache {
        /// Legacy key.
        key: String,
        /// Raw value.
        value: String,
        /// When the record was migrated.
        cached_at: i64,
    },
    /// Anything else.
    Generic {
        /// Legacy key.
        key: String,
        /// Raw value.
        value: String,
        /// When the record was migrated.
        migrated_at: i64,
    },
}

impl DestinationRecord {
    /// The collection this record belongs to.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Token { .. } => Collection::Tokens,
            Self::Preference { .. } => Collection::Preferences,
            Self::Setting { .. } => Collection::Settings,
            Self::Cache { .. } => Collection::Cache,
            Self::Generic { .. } => Collection::Generic,
        }
    }

    /// The legacy key the record was migrated from.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Token { key, .. }
            | Self::Preference { key, .. }
            | Self::Setting { key, .. }
            | Self::Cache { key, .. }
            | Self::Generic { key, .. } => key,
        }
    }

    /// The migrated value, verbatim from the legacy store.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Token { value, .. }
            | Self::Preference { value, .. }
            | Self::Setting { value, .. }
            | Self::Cache { value, .. }
            | Self::Generic { value, .. } => value,
        }
    }
}

/// The structured, asynchronous store being migrated to (e.g. IndexedDB via Dexie,
/// Room, Core Data). Implemented by the host.
///
/// Records are addressed by `(collection, key)` where `key` is the value returned from
/// [`DestinationStore::add`].
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait DestinationStore: Send + Sync {
    /// Inserts `record` into `collection` and returns its primary key.
    ///
    /// # Errors
    /// - `DestinationStoreError::WriteRejected` if this record cannot be stored
    /// - `DestinationStoreError::Unavailable` if the store cannot accept any write
    async fn add(
        &self,
        collection: Collection,
        record: DestinationRecord,
    ) -> Result<String, DestinationStoreError>;

    /// Returns every record in `collection`.
    ///
    /// # Errors
    /// - `DestinationStoreError::Unavailable` if the store cannot be read
    async fn to_array(
        &self,
        collection: Collection,
    ) -> Result<Vec<DestinationRecord>, DestinationStoreError>;

    /// Number of records in `collection`.
    ///
    /// # Errors
    /// - `DestinationStoreError::Unavailable` if the store cannot be read
    async fn count(&self, collection: Collection) -> Result<u64, DestinationStoreError>;

    /// Deletes the record stored under `key` in `collection`.
    ///
    /// # Errors
    /// - `DestinationStoreError::NotFound` if there is no such record
    /// - `DestinationStoreError::Unavailable` if the store cannot be written
    async fn delete(&self, collection: Collection, key: String)
        -> Result<(), DestinationStoreError>;
}
