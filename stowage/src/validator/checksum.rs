use serde_json::Value;

use super::value::ItemValue;
use crate::scanner::looks_like_json;

/// Hex-encoded BLAKE3 digest of the canonical form of `value`.
///
/// Text holding a JSON object or array is parsed first, so `{"a":1,"b":2}` and
/// `{"b":2,"a":1}` share a checksum. All other text hashes as a JSON string.
#[must_use]
pub fn generate_checksum(value: &ItemValue) -> String {
    generate_json_checksum(&normalize(value))
}

/// Hex-encoded BLAKE3 digest of a JSON value with object keys sorted at every depth.
#[must_use]
pub fn generate_json_checksum(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    hex::encode(blake3::hash(canonical.as_bytes()).as_bytes())
}

/// Whether `checksum` is the checksum of `value`. Hex case is ignored.
#[must_use]
pub fn verify_checksum(value: &ItemValue, checksum: &str) -> bool {
    generate_checksum(value).eq_ignore_ascii_case(checksum.trim())
}

fn normalize(value: &ItemValue) -> Value {
    match value {
        ItemValue::Text(text) if looks_like_json(text) => match serde_json::from_str(text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => Value::String(text.clone()),
        },
        other => other.to_json(),
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (index, (key, nested)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(nested, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, nested) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(nested, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_deterministic() {
        let value = ItemValue::from(r#"{"user":{"id":7,"tags":["a","b"]}}"#);
        assert_eq!(generate_checksum(&value), generate_checksum(&value));
        assert_eq!(generate_checksum(&value).len(), 64);
        assert!(verify_checksum(&value, &generate_checksum(&value)));
    }

    #[test]
    fn ignores_key_order() {
        let a = ItemValue::from(r#"{"a":1,"b":{"c":2,"d":3}}"#);
        let b = ItemValue::from(r#"{ "b": {"d":3, "c":2}, "a": 1 }"#);
        assert_eq!(generate_checksum(&a), generate_checksum(&b));
        assert_eq!(
            generate_json_checksum(&json!({"x": [1, {"z": 0, "y": 1}]})),
            generate_json_checksum(&json!({"x": [1, {"y": 1, "z": 0}]}))
        );
    }

    #[test]
    fn field_mutation_changes_checksum() {
        let original = json!({"id": 1, "name": "theme", "nested": {"on": true}});
        let checksum = generate_json_checksum(&original);

        let mutations = [
            json!({"id": 2, "name": "theme", "nested": {"on": true}}),
            json!({"id": 1, "name": "Theme", "nested": {"on": true}}),
            json!({"id": 1, "name": "theme", "nested": {"on": false}}),
            json!({"id": 1, "name": "theme", "nested": {"on": true}, "extra": null}),
            json!({"id": 1, "name": "theme"}),
        ];
        for mutated in mutations {
            assert_ne!(generate_json_checksum(&mutated), checksum, "{mutated}");
        }

        let text = ItemValue::from(original.to_string());
        assert!(!verify_checksum(&ItemValue::from(r#"{"id":1}"#), &generate_checksum(&text)));
    }

    #[test]
    fn distinguishes_types() {
        assert_ne!(
            generate_checksum(&ItemValue::from("1")),
            generate_checksum(&ItemValue::from(1.0))
        );
        assert_ne!(
            generate_checksum(&ItemValue::from("true")),
            generate_checksum(&ItemValue::from(true))
        );
        assert_ne!(
            generate_checksum(&ItemValue::Null),
            generate_checksum(&ItemValue::from("null"))
        );
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let value = ItemValue::from("dark");
        let checksum = generate_checksum(&value).to_uppercase();
        assert!(verify_checksum(&value, &checksum));
        assert!(!verify_checksum(&value, "not-a-checksum"));
    }
}
