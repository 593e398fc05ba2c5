//! Response normalization
//!
//! Backend error bodies come in several shapes (plain string, status object,
//! list of field validation errors, anything else). They are decoded once at
//! the transport boundary into [`ErrorBody`]; everything downstream works on
//! that closed set and turns it into a [`Verdict`].
//!
//! Detail text precedence, first match wins:
//! 1. Validation errors → `"<field>: <message>"` pairs joined with `", "`
//! 2. `status` + `reason` → `"<status>: <reason>"`, plus
//!    `"\nExpected: <expected>\nProvided: <provided>"` when both codes are present
//! 3. Plain string → verbatim
//! 4. Anything else → compact JSON
//! 5. No body → the transport's own message, or a generic one

use crate::models::Verdict;
use serde_json::{Map, Value};

/// Used when nothing more specific is known about a failure
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to verify medication. Please try again.";

const GENERIC_SUCCESS_MESSAGE: &str = "Verification successful";
const DEFAULT_FIELD_LABEL: &str = "Field";

const EXPECTED_CODE_KEYS: &[&str] = &["expectedCode", "expected_code", "expected_nafdac"];
const PROVIDED_CODE_KEYS: &[&str] = &["providedCode", "provided_code", "provided_nafdac"];

/// One entry of a validation error list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Status object carrying a reason and, for code mismatches, both codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReason {
    pub status: String,
    pub reason: String,
    pub expected_code: Option<String>,
    pub provided_code: Option<String>,
}

/// Closed set of error body shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    ValidationErrors(Vec<FieldError>),
    StatusReason(StatusReason),
    PlainText(String),
    Opaque(Value),
}

impl ErrorBody {
    /// Decode a raw response body. Blank bodies yield `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_json(value),
            Err(_) => Some(ErrorBody::PlainText(raw.to_string())),
        }
    }

    /// Classify a JSON body, unwrapping a `detail` or `message` envelope first
    pub fn from_json(value: Value) -> Option<Self> {
        if let Value::Object(map) = &value {
            for envelope in ["detail", "message"] {
                if let Some(inner) = map.get(envelope).filter(|v| !v.is_null()) {
                    return Self::classify(inner.clone());
                }
            }
        }
        Self::classify(value)
    }

    fn classify(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => {
                if text.trim().is_empty() {
                    None
                } else {
                    Some(ErrorBody::PlainText(text))
                }
            }
            Value::Array(items) => match parse_validation_errors(&items) {
                Some(errors) => Some(ErrorBody::ValidationErrors(errors)),
                None => Some(ErrorBody::Opaque(Value::Array(items))),
            },
            Value::Object(map) => match parse_status_reason(&map) {
                Some(status) => Some(ErrorBody::StatusReason(status)),
                None => Some(ErrorBody::Opaque(Value::Object(map))),
            },
            other => Some(ErrorBody::Opaque(other)),
        }
    }

    /// Human-readable text for this body
    pub fn detail_text(&self) -> String {
        match self {
            ErrorBody::ValidationErrors(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join(", "),
            ErrorBody::StatusReason(sr) => {
                let mut text = format!("{}: {}", sr.status, sr.reason);
                if let (Some(expected), Some(provided)) = (&sr.expected_code, &sr.provided_code) {
                    text.push_str(&format!("\nExpected: {}\nProvided: {}", expected, provided));
                }
                text
            }
            ErrorBody::PlainText(text) => text.clone(),
            ErrorBody::Opaque(value) => value.to_string(),
        }
    }
}

fn parse_validation_errors(items: &[Value]) -> Option<Vec<FieldError>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| {
            let entry = item.as_object()?;
            let message = entry
                .get("msg")
                .or_else(|| entry.get("message"))
                .and_then(present_text)?;
            Some(FieldError {
                field: field_label(entry.get("loc")),
                message,
            })
        })
        .collect()
}

/// `loc` is a path such as `["body", "nafdac_number"]`; the second element
/// names the field. Anything shorter gets the default label.
fn field_label(loc: Option<&Value>) -> String {
    loc.and_then(|loc| loc.get(1))
        .and_then(present_text)
        .unwrap_or_else(|| DEFAULT_FIELD_LABEL.to_string())
}

fn parse_status_reason(map: &Map<String, Value>) -> Option<StatusReason> {
    let status = map.get("status").and_then(present_text)?;
    let reason = map.get("reason").and_then(present_text)?;
    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| map.get(*key).and_then(present_text))
    };

    Some(StatusReason {
        status,
        reason,
        expected_code: lookup(EXPECTED_CODE_KEYS),
        provided_code: lookup(PROVIDED_CODE_KEYS),
    })
}

/// Text of a scalar, with empty strings, nulls and `false` treated as absent
fn present_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Failure reported by the transport layer, body already decoded
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    pub body: Option<ErrorBody>,
    /// Transport-level description, e.g. "Request failed with status code 500"
    pub message: String,
}

impl TransportFailure {
    /// No response at all (connection refused, timeout, ...)
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Non-success HTTP response
    pub fn from_response(status: u16, raw_body: &str) -> Self {
        Self {
            status: Some(status),
            body: ErrorBody::decode(raw_body),
            message: format!("Request failed with status code {}", status),
        }
    }
}

/// Detail text for any failure. Never empty.
pub fn failure_detail(failure: &TransportFailure) -> String {
    let text = match &failure.body {
        Some(body) => body.detail_text(),
        None => failure.message.clone(),
    };
    if text.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        text
    }
}

/// Normalize a failure into a verdict. Total: every input maps to a verdict
/// with non-empty detail text.
pub fn interpret_failure(failure: &TransportFailure) -> Verdict {
    Verdict::failure(failure_detail(failure))
}

/// Detail text for a success body.
///
/// A JSON string is unwrapped; a status object reads as `"<status>: <reason>"`
/// and a `message`/`detail` object as its text.
pub fn success_detail(raw: &str) -> String {
    let trimmed = raw.trim();
    let text = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(text)) => text,
        Ok(Value::Object(map)) => match parse_status_reason(&map) {
            Some(sr) => format!("{}: {}", sr.status, sr.reason),
            None => ["message", "detail"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| Value::Object(map).to_string()),
        },
        Ok(Value::Null) => String::new(),
        Ok(other) => other.to_string(),
        Err(_) => trimmed.to_string(),
    };
    if text.trim().is_empty() {
        GENERIC_SUCCESS_MESSAGE.to_string()
    } else {
        text
    }
}

/// Normalize a success body into an authentic verdict
pub fn interpret_success(raw: &str) -> Verdict {
    Verdict::authentic(success_detail(raw))
}
