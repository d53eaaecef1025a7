//! # Wayfarer Tools
//!
//! HTTP-backed tool collaborators for the Wayfarer travel agent, plus the
//! registry factory that wires them up from configuration. Everything
//! network-facing lives here so the core crate stays free of HTTP concerns.

mod attractions;
mod factory;
mod weather;

pub use attractions::AttractionSearchTool;
pub use factory::{build_registry, ToolBuildError};
pub use weather::WeatherTool;

use reqwest::StatusCode;
use serde_json::Value;
use wayfarer_core::tool::{ToolFailure, ToolInputs};

const MAX_BODY_PREVIEW_CHARS: usize = 200;

pub(crate) fn input_str<'a>(inputs: &'a ToolInputs, name: &str) -> Option<&'a str> {
    inputs.get(name).and_then(Value::as_str)
}

pub(crate) fn input_flag(inputs: &ToolInputs, name: &str) -> bool {
    inputs.get(name).and_then(Value::as_bool).unwrap_or(false)
}

/// Classify a transport-level error. Timeouts and refused connections are
/// worth retrying, anything else is not.
pub(crate) fn send_failure(err: reqwest::Error) -> ToolFailure {
    let message = format!("request failed: {err}");
    if err.is_timeout() || err.is_connect() {
        ToolFailure::transient(message)
    } else {
        ToolFailure::permanent(message)
    }
}

/// Classify a non-success HTTP status. Server-side trouble is retryable,
/// client errors such as an unknown location or a bad key are not.
pub(crate) fn status_failure(what: &str, status: StatusCode, body: &str) -> ToolFailure {
    let message = format!("{what} returned {status}: {}", truncate_body(body));
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ToolFailure::transient(message)
    } else {
        ToolFailure::permanent(message)
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut preview: String = trimmed.chars().take(MAX_BODY_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}
