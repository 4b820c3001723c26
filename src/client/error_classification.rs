//! Error classification logic

use crate::projection::Action;
use crate::transport::RawResponse;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

/// Short reason tag for an HTTP status.
pub fn reason_for_status(status: u16) -> &'static str {
    match status {
        400 => "bad_request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not_found",
        405 => "method_not_allowed",
        408 => "request_timeout",
        409 => "conflict",
        413 => "request_too_large",
        429 => "rate_limited",
        500 => "server_error",
        502 => "bad_gateway",
        503 => "unavailable",
        504 => "gateway_timeout",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "unexpected_status",
    }
}

/// Decide whether a completed exchange is a success for `action`.
///
/// - `check_blob` treats both 200 and 404 as answers.
/// - Non-2xx is `Error::Http` carrying the server's `"error"` text when there is one.
/// - A 2xx body with a top-level `"error"` string is `Error::Server`.
pub fn classify_status(action: Action, response: &RawResponse) -> Result<()> {
    let status = response.status;

    if action == Action::CheckBlob && (status == 200 || status == 404) {
        return Ok(());
    }

    let ctx = || {
        ErrorContext::new()
            .with_details(format!("{} {}", action.method(), action.path()))
            .with_source(action.name())
    };

    if response.is_success() {
        return match response.error_message() {
            Some(msg) => Err(Error::server_with_context("server_error", msg, ctx())),
            None => Ok(()),
        };
    }

    let message = response
        .error_message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} failed with HTTP {}", action, status));
    Err(Error::http_with_context(
        status,
        reason_for_status(status),
        message,
        ctx(),
    ))
}

/// Scan pull/push progress lines for a reported failure.
///
/// `body` is the decoded response: a list of progress objects, a single object, or text.
pub fn check_stream_lines(action: Action, body: &Value) -> Result<()> {
    let reason = match action {
        Action::PushModel => "push_failed",
        _ => "pull_failed",
    };

    let failure = match body {
        Value::Array(lines) => lines.iter().find_map(line_error),
        Value::Object(_) => line_error(body),
        Value::String(text) => text
            .lines()
            .filter_map(|l| serde_json::from_str::<Value>(l.trim()).ok())
            .find_map(|v| line_error(&v)),
        _ => None,
    };

    match failure {
        Some(msg) => Err(Error::pull_with_context(
            reason,
            msg,
            ErrorContext::new().with_source(action.name()),
        )),
        None => Ok(()),
    }
}

fn line_error(line: &Value) -> Option<String> {
    match line.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A 404 that means "the model is not on this server".
pub(crate) fn is_missing_model(err: &Error) -> bool {
    err.status() == Some(404) && err.message().to_lowercase().contains("not found")
}
