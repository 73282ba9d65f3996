use crate::primitives::{DestinationRecord, TokenType};
use crate::scanner::{DataCategory, LegacyItem};

/// Builds the destination record for a scanned legacy item. The value is copied verbatim.
pub(crate) fn record_for(item: &LegacyItem, now_ms: i64) -> DestinationRecord {
    let key = item.key.clone();
    let value = item.value.clone();
    match item.category {
        DataCategory::Tokens => DestinationRecord::Token {
            token_type: TokenType::infer(&key),
            key,
            value,
            created_at: now_ms,
            expired_at: None,
        },
        DataCategory::Preferences => DestinationRecord::Preference {
            key,
            value,
            updated_at: now_ms,
        },
        DataCategory::Settings => DestinationRecord::Setting {
            key,
            value,
            updated_at: now_ms,
        },
        DataCategory::Cache => DestinationRecord::Cache {
            key,
            value,
            cached_at: now_ms,
        },
        DataCategory::Other => DestinationRecord::Generic {
            key,
            value,
            migrated_at: now_ms,
        },
    }
}
