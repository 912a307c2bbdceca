//! Upstream error body parsing.
//!
//! Handles the envelopes the two backends emit:
//! - `OpenAI`: `{"error": {"message": "...", "type": "...", "code": "..."}}`
//! - Ollama:   `{"error": "..."}`
//! - Flat:     `{"message": "...", "code": "..."}`

use serde_json::Value;

/// Parsed upstream error.
#[derive(Debug)]
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Provider-specific error code (e.g. `"rate_limit_exceeded"`).
    pub code: Option<String>,
}

/// Statuses the hosted provider uses for rate limiting and credential
/// rejection.
pub fn is_unavailable_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 429)
}

/// Extract the error message from a JSON error body, if it has one.
pub fn extract_error_message(body: &str) -> Option<ApiErrorInfo> {
    let json = serde_json::from_str::<Value>(body).ok()?;

    if let Some(msg) = json["error"]["message"].as_str() {
        let code = json["error"]["code"]
            .as_str()
            .or_else(|| json["error"]["type"].as_str())
            .map(String::from);
        return Some(ApiErrorInfo {
            message: msg.to_string(),
            code,
        });
    }

    let msg = json["error"].as_str().or_else(|| json["message"].as_str())?;
    Some(ApiErrorInfo {
        message: msg.to_string(),
        code: json["code"].as_str().map(String::from),
    })
}

/// Parse an error response body, falling back to `HTTP {status}: {body}`.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    extract_error_message(body).unwrap_or_else(|| ApiErrorInfo {
        message: if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        },
        code: None,
    })
}
