use serde::{Deserialize, Serialize};

use crate::primitives::Collection;

/// Category of a legacy key, derived from its name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, uniffi::Enum,
)]
pub enum DataCategory {
    /// Credentials: names containing `token` or `api_key`.
    Tokens,
    /// Names containing `preference`.
    Preferences,
    /// Names containing `setting`.
    Settings,
    /// Names containing `cache`.
    Cache,
    /// Everything else.
    Other,
}

impl DataCategory {
    /// Every category, in classification precedence order.
    pub const ALL: [Self; 5] = [
        Self::Tokens,
        Self::Preferences,
        Self::Settings,
        Self::Cache,
        Self::Other,
    ];

    /// Lowercase name, as used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Preferences => "preferences",
            Self::Settings => "settings",
            Self::Cache => "cache",
            Self::Other => "other",
        }
    }

    /// Destination collection that receives items of this category.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Tokens => Collection::Tokens,
            Self::Preferences => Collection::Preferences,
            Self::Settings => Collection::Settings,
            Self::Cache => Collection::Cache,
            Self::Other => Collection::Generic,
        }
    }
}

impl std::fmt::Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Category assigned on match.
    pub category: DataCategory,
    /// Lowercase substrings; any one of them matching is enough.
    pub needles: &'static [&'static str],
}

impl ClassificationRule {
    fn matches(&self, lowercase_key: &str) -> bool {
        self.needles.iter().any(|needle| lowercase_key.contains(needle))
    }
}

/// Ordered classification table. The first matching rule wins, so `cache_token_x` is a
/// token: credentials take precedence over every other category.
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        category: DataCategory::Tokens,
        needles: &["token", "api_key"],
    },
    ClassificationRule {
        category: DataCategory::Preferences,
        needles: &["preference"],
    },
    ClassificationRule {
        category: DataCategory::Settings,
        needles: &["setting"],
    },
    ClassificationRule {
        category: DataCategory::Cache,
        needles: &["cache"],
    },
];

/// Classifies `key` by name. Matching is case-insensitive; unmatched keys are
/// [`DataCategory::Other`].
#[must_use]
pub fn classify_key(key: &str) -> DataCategory {
    let lowercase_key = key.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.matches(&lowercase_key))
        .map_or(DataCategory::Other, |rule| rule.category)
}
