use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A completed exchange: status, lowercased headers, and the decoded body.
///
/// The body is the parsed JSON document when the payload is valid JSON, the raw text
/// otherwise (e.g. newline-delimited streams), and `null` when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// Decode a text payload the way the transport does.
    pub fn decode_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn headers_value(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Unprojected view used when callers ask for the full response.
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status,
            "headers": self.headers_value(),
            "body": self.body,
        })
    }

    /// The `"error"` string a server puts in failure bodies, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(|v| v.as_str())
    }
}
