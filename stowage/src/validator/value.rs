use std::fmt;

use serde_json::Value;

/// A value handed to the validator.
///
/// Legacy values are always text, but destination records and custom callers may carry
/// primitives. Absence ("undefined") is modelled as `Option::None` around this type.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    /// An explicit null.
    Null,
    /// Text, possibly JSON-encoded.
    Text(String),
    /// A number.
    Number(f64),
    /// A boolean.
    Boolean(bool),
}

impl ItemValue {
    /// Name of the variant, used in mismatch messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
        }
    }

    /// Converts to a JSON value. Text is kept as a JSON string.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => serde_json::Number::from_f64(*number)
                .map_or(Value::Null, Value::Number),
            Self::Boolean(flag) => Value::Bool(*flag),
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<String> for ItemValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ItemValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<f64> for ItemValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<bool> for ItemValue {
    fn from(flag: bool) -> Self {
        Self::Boolean(flag)
    }
}
