use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorStatus {
  /// The backend answered with a non-2xx status
  #[error("HTTP {0}")]
  Http(u16),
  /// No response at all (DNS, connection refused, TLS, timeout)
  #[error("FETCH_ERROR")]
  FetchError,
  /// The backend answered but the body could not be decoded
  #[error("PARSING_ERROR ({original_status})")]
  ParsingError { original_status: u16 },
  /// A 2xx response whose envelope reported `success: false`
  #[error("REJECTED ({original_status})")]
  Rejected { original_status: u16 },
  /// Rejected on the client before any request was made
  #[error("VALIDATION_ERROR")]
  Validation,
}

/// Uniform `{status, data}` error returned by every layer.
///
/// `data` carries whatever the backend sent (usually `{success, message}`),
/// or `{message}` for failures produced on this side.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{status}: {}", message_for(.status, .data))]
pub struct ApiError {
  pub status: ErrorStatus,
  pub data: Value,
}

impl ApiError {
  pub fn new(status: ErrorStatus, data: Value) -> Self {
    Self { status, data }
  }

  pub fn http(code: u16, data: Value) -> Self {
    Self::new(ErrorStatus::Http(code), data)
  }

  pub fn fetch(error: impl fmt::Display) -> Self {
    Self::new(ErrorStatus::FetchError, json!({ "message": error.to_string() }))
  }

  pub fn parsing(original_status: u16, error: impl fmt::Display) -> Self {
    Self::new(
      ErrorStatus::ParsingError { original_status },
      json!({ "message": error.to_string() }),
    )
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::new(ErrorStatus::Validation, json!({ "message": message.into() }))
  }

  /// Human-readable message, preferring the one the backend sent.
  pub fn message(&self) -> String {
    message_for(&self.status, &self.data)
  }

  /// True when the request never left this process.
  pub fn is_validation(&self) -> bool {
    self.status == ErrorStatus::Validation
  }
}

fn message_for(status: &ErrorStatus, data: &Value) -> String {
  match data {
    Value::Object(map) => {
      if let Some(Value::String(message)) = map.get("message") {
        return message.clone();
      }
      if let Some(Value::String(error)) = map.get("error") {
        return error.clone();
      }
    }
    Value::String(s) if !s.is_empty() => return s.clone(),
    _ => {}
  }

  match *status {
    ErrorStatus::Http(code) => format!("Request failed with status {}", code),
    ErrorStatus::FetchError => "Network request failed".to_string(),
    ErrorStatus::ParsingError { .. } => "Response could not be parsed".to_string(),
    ErrorStatus::Rejected { .. } => "Request was rejected by the server".to_string(),
    ErrorStatus::Validation => "Invalid input".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_message_prefers_backend_message() {
    let err = ApiError::http(404, json!({ "success": false, "message": "Blog not found" }));
    assert_eq!(err.message(), "Blog not found");
    assert_eq!(err.to_string(), "HTTP 404: Blog not found");
  }

  #[test]
  fn test_message_falls_back_to_status() {
    let err = ApiError::http(500, Value::Null);
    assert_eq!(err.message(), "Request failed with status 500");
  }

  #[test]
  fn test_validation_is_distinct() {
    let err = ApiError::validation("too large");
    assert!(err.is_validation());
    assert_eq!(err.message(), "too large");
  }

  #[test]
  fn test_display_names_the_status() {
    assert_eq!(ErrorStatus::ParsingError { original_status: 200 }.to_string(), "PARSING_ERROR (200)");
    assert_eq!(
      ApiError::validation("Title is required").to_string(),
      "VALIDATION_ERROR: Title is required"
    );
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(ApiError::fetch("offline"));
    assert_eq!(boxed.to_string(), "FETCH_ERROR: offline");
  }
}
