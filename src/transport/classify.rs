//! Response normalization: unwrap success envelopes, reduce any error body to a single
//! message, and classify every failure into the closed `ErrorKind` taxonomy.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{AppResult, ClassifiedError, ErrorKind};

const MAX_TEXT_MESSAGE: usize = 300;

/// Failure before any response arrived.
pub fn send_error(e: &reqwest::Error) -> ClassifiedError {
    if e.is_builder() {
        return ClassifiedError::unknown(None, format!("invalid request: {}", e));
    }
    if e.is_timeout() {
        return ClassifiedError::network("request timed out");
    }
    ClassifiedError::network(e.to_string())
}

/// Failure while reading the body of a response whose status is already known.
pub fn body_error(status: u16, e: &reqwest::Error) -> ClassifiedError {
    if e.is_timeout() {
        return ClassifiedError::network("request timed out while reading response");
    }
    ClassifiedError::unknown(Some(status), format!("failed to read response body: {}", e))
}

/// First usable message in a duck-typed error body.
pub fn extract_message(status: u16, body: &str) -> String {
    let text = body.trim();
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        let candidates = [
            v.get("message"),
            v.get("error").filter(|e| e.is_string()),
            v.get("detail"),
            v.get("error").and_then(|e| e.get("message")),
            v.get("msg"),
        ];
        for c in candidates.into_iter().flatten() {
            if let Some(s) = c.as_str().filter(|s| !s.trim().is_empty()) {
                return s.to_string();
            }
        }
        if let Some(s) = v.as_str().filter(|s| !s.trim().is_empty()) {
            return s.to_string();
        }
    } else if !text.is_empty() {
        return text.chars().take(MAX_TEXT_MESSAGE).collect();
    }
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|r| r.to_string())
        .unwrap_or_else(|| format!("HTTP {}", status))
}

pub fn classify_response(status: u16, body: &str) -> ClassifiedError {
    ClassifiedError::from_response(status, extract_message(status, body))
}

/// Success body to payload: `{ "data": x, ... }` yields `x`, an empty body yields `null`,
/// and anything else is returned as-is.
pub fn unwrap_payload(body: &str) -> AppResult<Value> {
    let text = body.trim();
    if text.is_empty() {
        return Ok(Value::Null);
    }
    let v: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return Ok(Value::String(text.to_string())),
    };
    match v {
        Value::Object(mut map) if map.contains_key("data") => Ok(map.remove("data").unwrap_or(Value::Null)),
        other => Ok(other),
    }
}

/// One diagnostic line per classified failure; nothing is dropped silently.
pub fn log_failure(method: &Method, path: &str, e: &ClassifiedError) {
    match e.kind {
        ErrorKind::DemoWriteRestricted => info!(target: "transport", %method, path, status = ?e.status, "demo mode blocked write: {}", e.message),
        ErrorKind::AuthExpired | ErrorKind::Forbidden => warn!(target: "transport", %method, path, status = ?e.status, kind = %e.kind, "{}", e.message),
        ErrorKind::NetworkUnavailable => warn!(target: "transport", %method, path, "network unavailable: {}", e.message),
        ErrorKind::Unknown => error!(target: "transport", %method, path, status = ?e.status, "request failed: {}", e.message),
    }
}
