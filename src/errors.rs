use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
const FALLBACK_SERVER_MESSAGE: &str = "Server error";

/// Normalized failure details shared by every HTTP-level error variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: String,
    pub status: u16,
    pub field: Option<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
    pub non_field_errors: Vec<String>,
    pub error_type: Option<String>,
    pub error_code: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status, ..Self::default() }
    }
}

/// Result type returned by every network-backed operation.
pub type ApiResult<T> = Result<T, ApiError>;

/// Structured error produced by the REST boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    // ── No response reached us ───────────────────────────────────────────────
    #[error("Network error. Please check your connection.")]
    Network { detail: String },

    // ── Backend answered with an error ──────────────────────────────────────
    #[error("{}", .0.message)]
    Validation(ErrorDetails),

    #[error("Session is no longer valid: {}", .0.message)]
    Unauthorized(ErrorDetails),

    #[error("{}", .0.message)]
    Server(ErrorDetails),

    // ── Anything we could not classify ──────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn network(detail: impl Into<String>) -> Self {
        ApiError::Network { detail: detail.into() }
    }

    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            ApiError::Validation(d) | ApiError::Unauthorized(d) | ApiError::Server(d) => Some(d),
            ApiError::Network { .. } | ApiError::Unexpected(_) => None,
        }
    }

    /// HTTP status, `0` for network failures and `500` for unclassified ones.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network { .. } => 0,
            ApiError::Unexpected(_) => 500,
            other => other.details().map(|d| d.status).unwrap_or(500),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }

    /// First error message reported for `field`, if any.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.details()?
            .field_errors
            .get(field)
            .and_then(|errors| errors.first())
            .map(String::as_str)
    }

    pub fn non_field_errors(&self) -> &[String] {
        self.details().map(|d| d.non_field_errors.as_slice()).unwrap_or(&[])
    }
}

/// Converts any error body the backend produces into one [`ApiError`].
///
/// Understood shapes:
/// - `{ "error": bool, "error_type", "message", "details": { "field_errors": { field: [msg] } } }`
/// - `{ "success": bool, "error_code", "message", "details": { "field_errors": [{field, code, message}], "non_field_errors": [msg] } }`
/// - `{ "errors": [msg], "field" }`
/// - anything else with `message` or `detail`
pub fn normalize_error(status: u16, body: &str) -> ApiError {
    let details = match serde_json::from_str::<Value>(body) {
        Ok(data @ Value::Object(_)) => details_from_object(status, &data),
        _ => ErrorDetails::new(FALLBACK_SERVER_MESSAGE, status),
    };
    classify(details)
}

fn classify(details: ErrorDetails) -> ApiError {
    if details.status == 401 {
        ApiError::Unauthorized(details)
    } else if !details.field_errors.is_empty()
        || details.field.is_some()
        || matches!(details.status, 400 | 422)
    {
        ApiError::Validation(details)
    } else {
        ApiError::Server(details)
    }
}

fn details_from_object(status: u16, data: &Value) -> ErrorDetails {
    if data.get("error").is_some_and(Value::is_boolean) {
        return error_flag_shape(status, data);
    }
    if data.get("success").is_some_and(Value::is_boolean) {
        return success_flag_shape(status, data);
    }
    if let Some(errors) = data.get("errors").and_then(Value::as_array) {
        let message = errors
            .first()
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_SERVER_MESSAGE);
        let mut details = ErrorDetails::new(message, status);
        details.field = str_field(data, "field");
        return details;
    }
    let message = str_field(data, "message")
        .or_else(|| str_field(data, "detail"))
        .unwrap_or_else(|| FALLBACK_SERVER_MESSAGE.to_string());
    ErrorDetails::new(message, status)
}

fn error_flag_shape(status: u16, data: &Value) -> ErrorDetails {
    let mut details = ErrorDetails::new(message_or_fallback(data), status);
    details.error_type = str_field(data, "error_type");

    if let Some(fields) = data.pointer("/details/field_errors").and_then(Value::as_object) {
        for (field, messages) in fields {
            details.field_errors.insert(field.clone(), string_list(messages));
        }
    }
    details
}

fn success_flag_shape(status: u16, data: &Value) -> ErrorDetails {
    let mut details = ErrorDetails::new(message_or_fallback(data), status);
    details.error_code = str_field(data, "error_code");

    if let Some(entries) = data.pointer("/details/field_errors").and_then(Value::as_array) {
        for entry in entries {
            let Some(field) = entry.get("field").and_then(Value::as_str) else {
                continue;
            };
            let message = entry.get("message").and_then(Value::as_str).unwrap_or_default();
            details
                .field_errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        }
    }
    if let Some(list) = data.pointer("/details/non_field_errors") {
        details.non_field_errors = string_list(list);
    }
    details
}

fn message_or_fallback(data: &Value) -> String {
    str_field(data, "message").unwrap_or_else(|| FALLBACK_SERVER_MESSAGE.to_string())
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Failures on the WebSocket side of the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SocketError {
    #[error("Failed to open socket to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Failed to send on socket: {0}")]
    Send(String),

    #[error("No socket is open for the active conversation")]
    NotConnected,

    #[error("No logged-in user to send as")]
    NoSender,

    #[error("Failed to encode socket frame: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for SocketError {
    fn from(e: serde_json::Error) -> Self {
        SocketError::Encode(e.to_string())
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}
