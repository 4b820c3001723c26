//! Path mapper for field extraction from JSON documents
//!
//! Supports:
//! - Dot-notation paths (e.g., "details.family")
//! - Array indexing (e.g., "models[0].name" or "models.0.name")
//! - Explicit key sequences, where a key may contain dots

use serde_json::Value;

/// Path mapper for extracting values from JSON
pub struct PathMapper;

impl PathMapper {
    /// Get value from JSON using dot-notation path (supports array indexing)
    ///
    /// Examples:
    /// - "models[0].name"
    /// - "details.parameter_size"
    /// - "$.message.content"
    pub fn get_path<'a>(obj: &'a Value, path: &str) -> Option<&'a Value> {
        if path.is_empty() {
            return None;
        }

        // Remove leading "$." if present (JSONPath style)
        let normalized = path.trim().trim_start_matches("$.");
        let mut current = obj;

        for part in normalized.split('.') {
            if part.is_empty() {
                return None;
            }

            // "models[0]" style segment
            if let Some(bracket_pos) = part.find('[') {
                let key = &part[..bracket_pos];
                let idx_str = part[bracket_pos + 1..].trim_end_matches(']');

                if !key.is_empty() {
                    current = Self::step(current, key)?;
                }
                current = Self::step(current, idx_str)?;
            } else {
                current = Self::step(current, part)?;
            }
        }

        Some(current)
    }

    /// Walk an explicit sequence of keys. Keys are taken literally for objects and parsed
    /// as indices for arrays.
    pub fn get_keys<'a, S: AsRef<str>>(obj: &'a Value, keys: &[S]) -> Option<&'a Value> {
        keys.iter()
            .try_fold(obj, |current, key| Self::step(current, key.as_ref()))
    }

    /// Get string value from path (non-strings are rendered as JSON)
    pub fn get_string(obj: &Value, path: &str) -> Option<String> {
        Self::get_path(obj, path).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn step<'a>(current: &'a Value, key: &str) -> Option<&'a Value> {
        match current {
            Value::Object(map) => map.get(key),
            Value::Array(arr) => {
                if key == "*" {
                    arr.first()
                } else {
                    key.parse::<usize>().ok().and_then(|idx| arr.get(idx))
                }
            }
            _ => None,
        }
    }
}
