//! Value-level and batch-level validation of migrated data.
//!
//! [`DataValidator::validate_item`] decides whether a migrated value still means what the
//! legacy value meant. JSON objects and arrays compare structurally, so key order and
//! formatting are irrelevant. Plain text compares as strings under [`ValidationOptions`].
//! The checksum functions give a deterministic fingerprint of a value's canonical form.

mod checksum;
mod value;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::scanner::{looks_like_json, DataCategory};

pub use checksum::{generate_checksum, generate_json_checksum, verify_checksum};
pub use value::ItemValue;

/// Values quoted in error messages are cut to this many characters.
const MAX_QUOTED_CHARS: usize = 100;

/// A caller-supplied equivalence predicate. When set it replaces the built-in comparison.
///
/// Implemented for every `Fn(Option<&ItemValue>, Option<&ItemValue>) -> bool`.
pub trait CustomValidator: Send + Sync {
    /// Returns whether `migrated` is an acceptable migration of `original`.
    fn validate(&self, original: Option<&ItemValue>, migrated: Option<&ItemValue>) -> bool;
}

impl<F> CustomValidator for F
where
    F: Fn(Option<&ItemValue>, Option<&ItemValue>) -> bool + Send + Sync,
{
    fn validate(&self, original: Option<&ItemValue>, migrated: Option<&ItemValue>) -> bool {
        self(original, migrated)
    }
}

/// Comparison rules for plain-text values.
#[derive(Clone, Default)]
pub struct ValidationOptions {
    /// Compare text exactly; overrides both `ignore_*` flags.
    pub strict_mode: bool,
    /// Trim both values before comparing.
    pub ignore_whitespace: bool,
    /// Lowercase both values before comparing.
    pub ignore_case_for_strings: bool,
    /// Replaces the whole comparison when set.
    pub custom_validator: Option<Arc<dyn CustomValidator>>,
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("strict_mode", &self.strict_mode)
            .field("ignore_whitespace", &self.ignore_whitespace)
            .field("ignore_case_for_strings", &self.ignore_case_for_strings)
            .field("custom_validator", &self.custom_validator.is_some())
            .finish()
    }
}

/// Outcome of validating one value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the values are equivalent.
    pub is_valid: bool,
    /// Human-readable reasons, empty when valid.
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_comparison(outcome: Result<(), String>) -> Self {
        match outcome {
            Ok(()) => Self {
                is_valid: true,
                errors: Vec::new(),
            },
            Err(error) => Self {
                is_valid: false,
                errors: vec![error],
            },
        }
    }
}

/// Validation outcome of one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemValidation {
    /// Legacy key.
    pub key: String,
    /// Whether the item is valid.
    pub is_valid: bool,
    /// Reasons, empty when valid.
    pub errors: Vec<String>,
}

/// Aggregated outcome of [`DataValidator::validate_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValidationResult {
    /// Whether every item is valid.
    pub is_valid: bool,
    /// Number of validated items.
    pub total_items: usize,
    /// Number of valid items.
    pub valid_items: usize,
    /// Number of invalid items.
    pub invalid_items: usize,
    /// `valid_items / total_items`; 1.0 for an empty batch.
    pub success_rate: f64,
    /// One entry per item, in input order.
    pub details: Vec<ItemValidation>,
    /// The failing entries of `details`.
    pub errors: Vec<ItemValidation>,
}

/// An original value paired with its migrated counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationItem {
    /// Legacy key.
    pub key: String,
    /// Value read from the legacy store.
    pub original_value: Option<ItemValue>,
    /// Value read back from the destination store; `None` when the record is missing.
    pub migrated_value: Option<ItemValue>,
    /// Category of the key.
    pub category: DataCategory,
    /// Size of the legacy entry in bytes.
    pub size: u64,
}

/// Compares original and migrated values.
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    options: ValidationOptions,
}

impl DataValidator {
    /// Creates a validator with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator whose `options` apply to [`Self::validate_batch`] and to
    /// [`Self::validate_item`] calls without explicit options.
    #[must_use]
    pub const fn with_options(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// Options fixed at construction.
    #[must_use]
    pub const fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates one value pair.
    ///
    /// `None` means the value is absent. Messages name the key and both values.
    #[must_use]
    pub fn validate_item(
        &self,
        key: &str,
        original: Option<&ItemValue>,
        migrated: Option<&ItemValue>,
        options: Option<&ValidationOptions>,
    ) -> ValidationResult {
        let options = options.unwrap_or(&self.options);
        ValidationResult::from_comparison(compare(key, original, migrated, options))
    }

    /// Validates every item with the validator's options, in one pass.
    #[must_use]
    pub fn validate_batch(&self, items: &[MigrationItem]) -> BatchValidationResult {
        let details: Vec<ItemValidation> = items
            .iter()
            .map(|item| {
                let result = self.validate_item(
                    &item.key,
                    item.original_value.as_ref(),
                    item.migrated_value.as_ref(),
                    None,
                );
                ItemValidation {
                    key: item.key.clone(),
                    is_valid: result.is_valid,
                    errors: result.errors,
                }
            })
            .collect();

        let errors: Vec<ItemValidation> = details
            .iter()
            .filter(|detail| !detail.is_valid)
            .cloned()
            .collect();
        let total_items = details.len();
        let invalid_items = errors.len();
        let valid_items = total_items - invalid_items;

        crate::debug!(
            "batch_validation.completed total={} valid={} invalid={} timestamp={}",
            total_items,
            valid_items,
            invalid_items,
            Utc::now().to_rfc3339()
        );

        BatchValidationResult {
            is_valid: invalid_items == 0,
            total_items,
            valid_items,
            invalid_items,
            success_rate: success_rate(valid_items, total_items),
            details,
            errors,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(valid: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        valid as f64 / total as f64
    }
}

fn compare(
    key: &str,
    original: Option<&ItemValue>,
    migrated: Option<&ItemValue>,
    options: &ValidationOptions,
) -> Result<(), String> {
    if let Some(custom) = &options.custom_validator {
        if custom.validate(original, migrated) {
            return Ok(());
        }
        return Err(format!(
            "Custom validation failed for key '{key}': original={}, migrated={}",
            quote(original),
            quote(migrated)
        ));
    }

    let (original_value, migrated_value) = match (original, migrated) {
        (None, None) | (Some(ItemValue::Null), Some(ItemValue::Null)) => return Ok(()),
        (None | Some(ItemValue::Null), _) | (_, None | Some(ItemValue::Null)) => {
            return Err(format!(
                "Data mismatch for key '{key}': original={}, migrated={}",
                quote(original),
                quote(migrated)
            ));
        }
        (Some(original_value), Some(migrated_value)) => (original_value, migrated_value),
    };

    match (original_value, migrated_value) {
        (ItemValue::Text(a), ItemValue::Text(b)) => compare_text(key, a, b, options),
        (ItemValue::Number(a), ItemValue::Number(b)) => {
            if numbers_equal(*a, *b) {
                Ok(())
            } else {
                Err(value_mismatch(key, original, migrated))
            }
        }
        (ItemValue::Boolean(a), ItemValue::Boolean(b)) => {
            if a == b {
                Ok(())
            } else {
                Err(value_mismatch(key, original, migrated))
            }
        }
        (a, b) => Err(format!(
            "Type mismatch for key '{key}': original is {} ({}), migrated is {} ({})",
            a.type_name(),
            truncate(&a.to_string()),
            b.type_name(),
            truncate(&b.to_string())
        )),
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn compare_text(
    key: &str,
    original: &str,
    migrated: &str,
    options: &ValidationOptions,
) -> Result<(), String> {
    if original == migrated {
        return Ok(());
    }

    let parsed_original = serde_json::from_str::<Value>(original);
    let parsed_migrated = serde_json::from_str::<Value>(migrated);
    match (&parsed_original, &parsed_migrated) {
        (Ok(a), Ok(b)) => {
            if json_equal(a, b) {
                return Ok(());
            }
            if is_structured(a) || is_structured(b) {
                return Err(format!(
                    "JSON structure mismatch for key '{key}': original={}, migrated={}",
                    truncate(original),
                    truncate(migrated)
                ));
            }
            return Err(data_mismatch(key, &truncate(original), &truncate(migrated)));
        }
        (Err(e), _) if looks_like_json(original) => {
            return Err(format!(
                "JSON parse error for key '{key}' in original value ({e}): original={}, migrated={}",
                truncate(original),
                truncate(migrated)
            ));
        }
        (_, Err(e)) if looks_like_json(migrated) => {
            return Err(format!(
                "JSON parse error for key '{key}' in migrated value ({e}): original={}, migrated={}",
                truncate(original),
                truncate(migrated)
            ));
        }
        // At least one side is plain text.
        _ => {}
    }

    if normalize_text(original, options) == normalize_text(migrated, options) {
        Ok(())
    } else {
        Err(data_mismatch(key, &truncate(original), &truncate(migrated)))
    }
}

const fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Deep equality where numbers compare by value, so `1.0` equals `1`.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => numbers_equal(x, y),
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

fn normalize_text(text: &str, options: &ValidationOptions) -> String {
    if options.strict_mode {
        return text.to_string();
    }
    let text = if options.ignore_whitespace {
        text.trim()
    } else {
        text
    };
    if options.ignore_case_for_strings {
        text.to_lowercase()
    } else {
        text.to_string()
    }
}

fn value_mismatch(
    key: &str,
    original: Option<&ItemValue>,
    migrated: Option<&ItemValue>,
) -> String {
    data_mismatch(key, &quote(original), &quote(migrated))
}

fn data_mismatch(key: &str, original: &str, migrated: &str) -> String {
    format!(
        "Data mismatch for key '{key}': values do not match (original={original}, migrated={migrated})"
    )
}

fn quote(value: Option<&ItemValue>) -> String {
    value.map_or_else(|| "undefined".to_string(), |value| truncate(&value.to_string()))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_QUOTED_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
