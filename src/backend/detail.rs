//! Normalization of the backend's `{detail}` failure payloads.
//!
//! The backend reports failures as `{"detail": "text"}`, `{"detail": {"code", "message"}}`, or
//! (for request validation) `{"detail": [{"msg": ...}]}`. Everything is folded into
//! [`ErrorDetail`] here so callers never branch on the payload's JSON type.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

const PREVIEW_LIMIT: usize = 256;

/// Structured failure detail with optional machine-readable code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
	/// Backend error code (e.g., `ALREADY_BLOCKED`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Human-readable message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
impl ErrorDetail {
	/// Builds a detail carrying only a message.
	pub fn message(message: impl Into<String>) -> Self {
		Self { code: None, message: Some(message.into()) }
	}

	/// Parses a failure body, falling back to a text preview for non-JSON payloads.
	pub fn from_body(body: &[u8]) -> Self {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Self::default();
		}

		match serde_json::from_slice::<Value>(body) {
			Ok(value) => Self::from_value(&value),
			Err(_) => Self::message(truncate_preview(String::from_utf8_lossy(body).trim())),
		}
	}

	/// Extracts a detail from an already parsed JSON document.
	pub fn from_value(value: &Value) -> Self {
		match value.get("detail") {
			Some(Value::String(text)) => Self::message(text.clone()),
			Some(Value::Object(map)) => Self {
				code: map.get("code").and_then(scalar_text),
				message: map.get("message").or_else(|| map.get("msg")).and_then(scalar_text),
			},
			Some(Value::Array(items)) => Self {
				code: None,
				message: items.first().and_then(|item| item.get("msg")).and_then(scalar_text),
			},
			_ => Self {
				code: value.get("code").and_then(scalar_text),
				message: value.get("message").or_else(|| value.get("error")).and_then(scalar_text),
			},
		}
	}

	/// Returns `true` when neither a code nor a message was supplied.
	pub fn is_empty(&self) -> bool {
		self.code.is_none() && self.message.is_none()
	}
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
