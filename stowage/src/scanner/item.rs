use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::{classify_key, DataCategory};

/// Shape of a legacy value once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum DataType {
    /// Plain text, including anything that is not valid JSON.
    String,
    /// A JSON object or array.
    Object,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
}

/// A single legacy entry, as seen by one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct LegacyItem {
    /// Legacy key.
    pub key: String,
    /// Raw stored text.
    pub value: String,
    /// Estimated UTF-16 footprint of key and value, in bytes.
    pub size: u64,
    /// Category derived from the key name.
    pub category: DataCategory,
    /// Parsed shape of the value.
    pub data_type: DataType,
    /// Whether the value is a JSON object or array.
    pub is_json: bool,
    /// `false` only for text that looks like JSON but does not parse.
    pub is_valid: bool,
}

impl LegacyItem {
    /// Classifies and inspects a raw legacy entry.
    #[must_use]
    pub fn inspect(key: String, value: String) -> Self {
        let size = utf16_size(&key) + utf16_size(&value);
        let category = classify_key(&key);
        let (data_type, is_json, is_valid) = inspect_value(&value);
        Self {
            key,
            value,
            size,
            category,
            data_type,
            is_json,
            is_valid,
        }
    }
}

/// Whether text starts like a JSON object or array.
#[must_use]
pub fn looks_like_json(value: &str) -> bool {
    let trimmed = value.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn utf16_size(s: &str) -> u64 {
    s.encode_utf16().count() as u64 * 2
}

fn inspect_value(value: &str) -> (DataType, bool, bool) {
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Object(_) | Value::Array(_)) => (DataType::Object, true, true),
        Ok(Value::Number(_)) => (DataType::Number, false, true),
        Ok(Value::Bool(_)) => (DataType::Boolean, false, true),
        Ok(Value::String(_) | Value::Null) => (DataType::String, false, true),
        Err(_) => (DataType::String, false, !looks_like_json(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_structured_json() {
        let item = LegacyItem::inspect(
            "user_preference_sidebar".to_string(),
            r#"{"collapsed":false}"#.to_string(),
        );
        assert_eq!(item.category, DataCategory::Preferences);
        assert_eq!(item.data_type, DataType::Object);
        assert!(item.is_json);
        assert!(item.is_valid);

        let list = LegacyItem::inspect("features".to_string(), r#"["a","b"]"#.to_string());
        assert_eq!(list.data_type, DataType::Object);
        assert!(list.is_json);
    }

    #[test]
    fn detects_primitives() {
        let boolean = LegacyItem::inspect("app_setting_debug".to_string(), "true".to_string());
        assert_eq!(boolean.data_type, DataType::Boolean);
        assert!(!boolean.is_json);

        let number = LegacyItem::inspect("count".to_string(), "42".to_string());
        assert_eq!(number.data_type, DataType::Number);

        let null = LegacyItem::inspect("null_value".to_string(), "null".to_string());
        assert_eq!(null.data_type, DataType::String);
    }

    #[test]
    fn plain_text_is_valid_string() {
        let item = LegacyItem::inspect("auth_token".to_string(), "eyJhbGciOi...".to_string());
        assert_eq!(item.data_type, DataType::String);
        assert!(!item.is_json);
        assert!(item.is_valid);
    }

    #[test]
    fn malformed_json_is_invalid() {
        let item = LegacyItem::inspect(
            "invalid_json".to_string(),
            r#"{"incomplete": json}"#.to_string(),
        );
        assert!(!item.is_valid);
        assert!(!item.is_json);
        assert_eq!(item.data_type, DataType::String);
    }

    #[test]
    fn size_counts_utf16_bytes() {
        let item = LegacyItem::inspect("ab".to_string(), "cd".to_string());
        assert_eq!(item.size, 8);

        // U+1F600 needs a surrogate pair.
        let emoji = LegacyItem::inspect("k".to_string(), "\u{1F600}".to_string());
        assert_eq!(emoji.size, 6);

        let empty = LegacyItem::inspect("empty".to_string(), String::new());
        assert_eq!(empty.size, 10);
    }
}
