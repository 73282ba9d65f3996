//! Legacy store scanning
//!
//! The scanner enumerates every legacy key exactly once, classifies it by name, and
//! inspects its value (size, JSON shape, validity). It never fails: a store that throws
//! during enumeration yields an empty [`ScanResult`] whose `error` describes the fault.

mod classify;
mod filter;
mod item;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::primitives::{LegacyStore, LegacyStoreError};
use crate::stowage_export;

pub use classify::{classify_key, ClassificationRule, DataCategory, CLASSIFICATION_RULES};
pub use filter::KeyFilter;
pub use item::{looks_like_json, DataType, LegacyItem};

const ESTIMATE_BASE_MS: u64 = 50;
const ESTIMATE_PER_ITEM_MS: u64 = 2;
const ESTIMATE_BYTES_PER_MS: u64 = 10_240;

/// Filters applied while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct ScanOptions {
    /// Keys to skip entirely.
    pub exclude_keys: Vec<String>,
    /// Anchored wildcard patterns (`*`, `?`) of keys to skip.
    pub exclude_patterns: Vec<String>,
    /// Only return these categories. `None` means all.
    pub include_categories: Option<Vec<DataCategory>>,
    /// Stop after this many items; `has_more` reports the truncation.
    pub max_items: Option<u32>,
}

/// Keys of a scan grouped by category, each list in native store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct CategoryIndex {
    /// Token keys.
    pub tokens: Vec<String>,
    /// Preference keys.
    pub preferences: Vec<String>,
    /// Setting keys.
    pub settings: Vec<String>,
    /// Cache keys.
    pub cache: Vec<String>,
    /// Unclassified keys.
    pub other: Vec<String>,
}

impl CategoryIndex {
    fn push(&mut self, category: DataCategory, key: String) {
        match category {
            DataCategory::Tokens => self.tokens.push(key),
            DataCategory::Preferences => self.preferences.push(key),
            DataCategory::Settings => self.settings.push(key),
            DataCategory::Cache => self.cache.push(key),
            DataCategory::Other => self.other.push(key),
        }
    }

    /// Keys recorded for `category`.
    #[must_use]
    pub fn keys(&self, category: DataCategory) -> &[String] {
        match category {
            DataCategory::Tokens => &self.tokens,
            DataCategory::Preferences => &self.preferences,
            DataCategory::Settings => &self.settings,
            DataCategory::Cache => &self.cache,
            DataCategory::Other => &self.other,
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct ScanResult {
    /// Number of returned items.
    pub total_items: u32,
    /// Sum of the returned items' sizes, in bytes.
    pub total_size: u64,
    /// `total_size / total_items`, rounded down; 0 when empty.
    pub average_item_size: u64,
    /// Returned keys by category.
    pub categories: CategoryIndex,
    /// Returned items, in native store order.
    pub items: Vec<LegacyItem>,
    /// Whether `max_items` cut the result short.
    pub has_more: bool,
    /// Set when the legacy store failed during enumeration; `items` is then empty.
    pub error: Option<String>,
}

impl ScanResult {
    fn from_items(items: Vec<LegacyItem>, has_more: bool) -> Self {
        let mut categories = CategoryIndex::default();
        let mut total_size = 0_u64;
        for item in &items {
            categories.push(item.category, item.key.clone());
            total_size = total_size.saturating_add(item.size);
        }
        let total_items = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Self {
            total_items,
            total_size,
            average_item_size: total_size.checked_div(u64::from(total_items)).unwrap_or(0),
            categories,
            items,
            has_more,
            error: None,
        }
    }

    fn failed(error: &LegacyStoreError) -> Self {
        Self {
            error: Some(format!("Failed to scan legacy store: {error}")),
            ..Self::default()
        }
    }

    /// Renders a human-readable summary. Formatting only; the fields are authoritative.
    #[must_use]
    pub fn render_report(&self) -> String {
        let estimate = MigrationEstimate::for_scan(self);
        let invalid = self.items.iter().filter(|item| !item.is_valid).count();
        let json = self.items.iter().filter(|item| item.is_json).count();

        let mut report = format!(
            "Legacy storage scan report\n\
             ==========================\n\
             Total items: {}\n\
             Total size: {} bytes (average {} bytes per item)\n\
             JSON items: {json}\n\
             Invalid JSON items: {invalid}\n\
             Estimated migration time: {} ms\n\
             Data categories:\n",
            self.total_items,
            self.total_size,
            self.average_item_size,
            estimate.estimated_time_ms
        );
        for category in DataCategory::ALL {
            report.push_str(&format!(
                "  {category}: {}\n",
                self.categories.keys(category).len()
            ));
        }
        if self.has_more {
            report.push_str("More items exist beyond the scan limit\n");
        }
        if let Some(error) = &self.error {
            report.push_str(&format!("Scan error: {error}\n"));
        }
        report
    }
}

/// Rough migration cost of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct MigrationEstimate {
    /// Items that would be migrated.
    pub item_count: u32,
    /// Their total size in bytes.
    pub total_size_bytes: u64,
    /// Estimated duration. A pure function of the two counts above.
    pub estimated_time_ms: u64,
}

impl MigrationEstimate {
    /// Estimates the cost of migrating the items of `scan`.
    #[must_use]
    pub fn for_scan(scan: &ScanResult) -> Self {
        let estimated_time_ms = ESTIMATE_BASE_MS
            .saturating_add(u64::from(scan.total_items).saturating_mul(ESTIMATE_PER_ITEM_MS))
            .saturating_add(scan.total_size.div_ceil(ESTIMATE_BYTES_PER_MS));
        Self {
            item_count: scan.total_items,
            total_size_bytes: scan.total_size,
            estimated_time_ms,
        }
    }
}

/// Reads and classifies the contents of a [`LegacyStore`].
#[derive(uniffi::Object)]
pub struct LegacyDataScanner {
    store: Arc<dyn LegacyStore>,
}

#[stowage_export]
impl LegacyDataScanner {
    /// Creates a scanner over `store`.
    #[uniffi::constructor]
    pub fn new(store: Arc<dyn LegacyStore>) -> Self {
        Self { store }
    }

    /// Scans the whole store, applying `options`.
    ///
    /// Never fails; storage faults are reported through [`ScanResult::error`].
    #[must_use]
    pub fn scan_all_data(&self, options: Option<ScanOptions>) -> ScanResult {
        self.scan(&options.unwrap_or_default())
    }

    /// Returns every item of `category`, or an empty list if the store fails.
    #[must_use]
    pub fn scan_by_category(&self, category: DataCategory) -> Vec<LegacyItem> {
        self.scan(&ScanOptions {
            include_categories: Some(vec![category]),
            ..ScanOptions::default()
        })
        .items
    }

    /// Estimates how long migrating the current store contents would take.
    #[must_use]
    pub fn estimate_migration_time(&self) -> MigrationEstimate {
        MigrationEstimate::for_scan(&self.scan(&ScanOptions::default()))
    }

    /// Scans the store and renders a summary report.
    #[must_use]
    pub fn generate_scan_report(&self) -> String {
        self.scan(&ScanOptions::default()).render_report()
    }
}

impl LegacyDataScanner {
    /// Runs a scan with borrowed options.
    #[must_use]
    pub fn scan(&self, options: &ScanOptions) -> ScanResult {
        let started = Utc::now();
        match self.collect(options) {
            Ok((items, has_more)) => {
                let result = ScanResult::from_items(items, has_more);
                crate::debug!(
                    "legacy_scan.completed items={} total_size={} has_more={} duration_ms={} timestamp={}",
                    result.total_items,
                    result.total_size,
                    result.has_more,
                    (Utc::now() - started).num_milliseconds(),
                    Utc::now().to_rfc3339()
                );
                result
            }
            Err(e) => {
                crate::error!(
                    "legacy_scan.failed error={} timestamp={}",
                    e,
                    Utc::now().to_rfc3339()
                );
                ScanResult::failed(&e)
            }
        }
    }

    fn collect(
        &self,
        options: &ScanOptions,
    ) -> Result<(Vec<LegacyItem>, bool), LegacyStoreError> {
        let filter = KeyFilter::new(&options.exclude_keys, &options.exclude_patterns);
        let limit = options.max_items.map(|max| max as usize);
        let length = self.store.length()?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut has_more = false;

        for index in 0..length {
            let Some(key) = self.store.key(index)? else {
                continue;
            };
            if !seen.insert(key.clone()) || filter.excludes(&key) {
                continue;
            }
            let category = classify_key(&key);
            if let Some(included) = &options.include_categories {
                if !included.contains(&category) {
                    continue;
                }
            }
            if limit.is_some_and(|limit| items.len() >= limit) {
                has_more = true;
                break;
            }
            // Entries can disappear between `key` and `get_item`; skip those.
            let Some(value) = self.store.get_item(key.clone())? else {
                crate::debug!("legacy_scan.key_vanished key={}", key);
                continue;
            };
            items.push(LegacyItem::inspect(key, value));
        }

        Ok((items, has_more))
    }
}
