//! Response projection: pull the value a caller asked for out of a raw response.
//!
//! A [`FieldSpec`] addresses part of a [`RawResponse`]: a body field, one or more levels
//! below a body field, or a response attribute such as the status or headers. Resolution
//! never panics. A missing field is `null`; a container of the wrong shape is an
//! [`Error::Invalid`] naming the action and the spec.
//!
//! Resolved strings get one more pass: a string holding a JSON document is decoded, and a
//! string holding newline-delimited JSON (the streaming endpoints) becomes a list.

mod action;

pub use action::Action;

use crate::transport::RawResponse;
use crate::utils::json_path::PathMapper;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSpec {
    /// The action's default extraction.
    #[default]
    None,
    /// A named field of the body.
    Top(String),
    /// `parent` on the response (body key, or `body`/`headers`/`status`), then `child`.
    Nested(String, String),
    /// `parent`, then a multi-step lookup inside it.
    Path(String, Vec<String>),
    /// A response attribute: `status`, `headers` or `body`.
    Meta(String),
}

impl FieldSpec {
    pub fn top(name: impl Into<String>) -> Self {
        FieldSpec::Top(name.into())
    }

    pub fn nested(parent: impl Into<String>, child: impl Into<String>) -> Self {
        FieldSpec::Nested(parent.into(), child.into())
    }

    pub fn path<I, S>(parent: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSpec::Path(parent.into(), keys.into_iter().map(Into::into).collect())
    }

    pub fn meta(name: impl Into<String>) -> Self {
        FieldSpec::Meta(name.into())
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::None => write!(f, "none"),
            FieldSpec::Top(name) => write!(f, "top({})", name),
            FieldSpec::Nested(parent, child) => write!(f, "nested({}, {})", parent, child),
            FieldSpec::Path(parent, keys) => write!(f, "path({}, [{}])", parent, keys.join(", ")),
            FieldSpec::Meta(name) => write!(f, "meta({})", name),
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::top(name)
    }
}

impl From<(&str, &str)> for FieldSpec {
    fn from((parent, child): (&str, &str)) -> Self {
        FieldSpec::nested(parent, child)
    }
}

/// Project `response` for `action`.
///
/// With `short == false` the whole response is returned as
/// `{"status": .., "headers": {..}, "body": ..}`.
pub fn project(response: &RawResponse, spec: &FieldSpec, action: Action, short: bool) -> Result<Value> {
    if !short {
        return Ok(response.to_value());
    }

    let effective = match spec {
        FieldSpec::None => action.default_field(),
        other => Some(other.clone()),
    };

    let resolved = match &effective {
        None => response.body.clone(),
        Some(s) => resolve(response, s).map_err(|detail| {
            Error::invalid_with_context(
                "field_spec",
                format!("Cannot project {} response with {}: {}", action, s, detail),
                ErrorContext::new()
                    .with_field_path(s.to_string())
                    .with_source("projection"),
            )
        })?,
    };

    Ok(expand_string(resolved))
}

fn resolve(response: &RawResponse, spec: &FieldSpec) -> std::result::Result<Value, String> {
    match spec {
        FieldSpec::None => Ok(response.body.clone()),
        FieldSpec::Top(name) => lookup_in(&response.body, "body", name),
        FieldSpec::Nested(parent, child) => {
            let container = container(response, parent)?;
            lookup_in(&container, parent, child)
        }
        FieldSpec::Path(parent, keys) => {
            let container = container(response, parent)?;
            match &container {
                Value::Object(_) | Value::Array(_) => {
                    Ok(PathMapper::get_keys(&container, keys).cloned().unwrap_or(Value::Null))
                }
                Value::Null => Ok(Value::Null),
                other if keys.is_empty() => Ok(other.clone()),
                other => Err(format!("`{}` is {}, not a structure", parent, describe(other))),
            }
        }
        FieldSpec::Meta(name) => Ok(meta(response, name).unwrap_or(Value::Null)),
    }
}

fn meta(response: &RawResponse, name: &str) -> Option<Value> {
    match name {
        "status" => Some(Value::from(response.status)),
        "headers" => Some(response.headers_value()),
        "body" => Some(response.body.clone()),
        _ => None,
    }
}

/// The value a `nested`/`path` parent names.
fn container(response: &RawResponse, parent: &str) -> std::result::Result<Value, String> {
    if let Some(v) = meta(response, parent) {
        return Ok(v);
    }
    lookup_in(&response.body, "body", parent)
}

fn lookup_in(container: &Value, container_name: &str, key: &str) -> std::result::Result<Value, String> {
    match container {
        Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        Value::Array(items) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx))
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(format!(
            "`{}` is {} and has no field `{}`",
            container_name,
            describe(other),
            key
        )),
    }
}

fn describe(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Decode strings that carry a JSON document or newline-delimited JSON.
///
/// A string that parses as JSON is replaced by the parsed value, scalars included. Otherwise
/// each line is tried; two or more parsed lines become a list and unparsable lines are
/// dropped. Anything else comes back unchanged.
pub fn expand_string(value: Value) -> Value {
    let text = match value {
        Value::String(s) => s,
        other => return other,
    };

    if let Ok(doc) = serde_json::from_str::<Value>(&text) {
        return doc;
    }

    let lines: Vec<Value> = text
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect();
    if lines.len() >= 2 {
        Value::Array(lines)
    } else {
        Value::String(text)
    }
}
