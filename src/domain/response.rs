//! Response envelopes shared by every endpoint.
//!
//! Failures are answered with an [`ErrorResponse`], successes with an
//! [`ApiResponse`]. Both shapes are part of the public wire contract.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::error_code::ExceptionCode;

/// Offset of the zone error timestamps are reported in (UTC+09:00).
pub const RESPONSE_UTC_OFFSET_SECS: i32 = 9 * 3600;

fn response_offset() -> FixedOffset {
    FixedOffset::east_opt(RESPONSE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current time in the response zone.
#[must_use]
pub fn response_timestamp() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&response_offset())
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub value: Option<String>,
    pub reason: Option<String>,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        value: Option<impl Into<String>>,
        reason: Option<impl Into<String>>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.map(Into::into),
            reason: reason.map(Into::into),
        }
    }

    /// Flattens `validator` output into field errors.
    ///
    /// One entry per (field, failed rule). The rejected value comes from the
    /// validator's `value` parameter; the reason is the rule's message, or
    /// its code when no message was configured. Fields are sorted by name so
    /// the output is deterministic.
    #[must_use]
    pub fn from_validation(errors: &validator::ValidationErrors) -> Vec<Self> {
        let mut fields: Vec<(String, &Vec<validator::ValidationError>)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, failures)| (field.to_string(), failures))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| Self {
                    field: field.clone(),
                    value: failure.params.get("value").and_then(render_rejected_value),
                    reason: Some(
                        failure
                            .message
                            .as_ref()
                            .map_or_else(|| failure.code.to_string(), ToString::to_string),
                    ),
                })
            })
            .collect()
    }
}

fn render_rejected_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Uniform error envelope.
///
/// ```json
/// {"message": "...", "status": 400, "code": "C400-01", "errors": [...], "timestamp": "..."}
/// ```
///
/// `errors` is omitted from the JSON when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status: u16,
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    pub timestamp: DateTime<FixedOffset>,
}

impl ErrorResponse {
    /// Envelope carrying the entry's default message.
    pub fn of<C: ExceptionCode + ?Sized>(code: &C) -> Self {
        Self::build(code, code.message().to_string(), Vec::new())
    }

    /// Envelope with the entry's status and code but a different message.
    pub fn with_message<C: ExceptionCode + ?Sized>(code: &C, message: impl Into<String>) -> Self {
        Self::build(code, message.into(), Vec::new())
    }

    /// Envelope with the default message and the given field errors, in order.
    pub fn with_field_errors<C: ExceptionCode + ?Sized>(code: &C, errors: Vec<FieldError>) -> Self {
        Self::build(code, code.message().to_string(), errors)
    }

    fn build<C: ExceptionCode + ?Sized>(code: &C, message: String, errors: Vec<FieldError>) -> Self {
        Self {
            message,
            status: code.status().as_u16(),
            code: code.code().to_string(),
            errors,
            timestamp: response_timestamp(),
        }
    }
}

/// Success envelope; `data` is omitted from the JSON when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn with_data(data: T, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}
