//! Error types for calls against the storefront API.

use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Best-effort parse of a backend error body (`{ok: false, code, message}`).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

impl ErrorBody {
  pub fn from_bytes(bytes: &[u8]) -> Self {
    serde_json::from_slice(bytes).unwrap_or_default()
  }
}

impl fmt::Display for ErrorBody {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.code, &self.message) {
      (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
      (None, Some(message)) => write!(f, "{}", message),
      (Some(code), None) => write!(f, "{}", code),
      (None, None) => write!(f, "no details"),
    }
  }
}

/// Failure of a single API operation.
#[derive(Error, Debug)]
pub enum ApiError {
  /// The request never completed
  #[error("Request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The server answered with a non-success status
  #[error("HTTP {status}: {body}")]
  Http { status: StatusCode, body: ErrorBody },

  /// The server answered 2xx but with `ok: false`
  #[error("Request rejected: {0}")]
  Rejected(ErrorBody),

  /// The response body did not have the expected shape
  #[error("Invalid response: {0}")]
  Decode(#[from] serde_json::Error),

  /// The request URL could not be built
  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),
}

impl ApiError {
  pub fn rejected(code: Option<&str>, message: &str) -> Self {
    ApiError::Rejected(ErrorBody {
      code: code.map(String::from),
      message: Some(message.to_string()),
    })
  }

  /// HTTP status, when the server answered.
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      ApiError::Transport(e) => e.status(),
      _ => None,
    }
  }

  pub fn body(&self) -> Option<&ErrorBody> {
    match self {
      ApiError::Http { body, .. } | ApiError::Rejected(body) => Some(body),
      _ => None,
    }
  }

  /// Whether the credential was refused (401/403).
  pub fn is_auth_failure(&self) -> bool {
    matches!(
      self.status(),
      Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
    )
  }

  pub fn is_conflict(&self) -> bool {
    self.status() == Some(StatusCode::CONFLICT)
  }

  /// Text for a user-facing notification: server message, else code, else `fallback`.
  pub fn user_message(&self, fallback: &str) -> String {
    self
      .body()
      .and_then(|b| b.message.clone().or_else(|| b.code.clone()))
      .unwrap_or_else(|| fallback.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn http(status: u16, body: &str) -> ApiError {
    ApiError::Http {
      status: StatusCode::from_u16(status).unwrap(),
      body: ErrorBody::from_bytes(body.as_bytes()),
    }
  }

  #[test]
  fn test_user_message_prefers_message_then_code() {
    let err = http(400, r#"{"ok":false,"code":"VALIDATION","message":"price required"}"#);
    assert_eq!(err.user_message("Update failed"), "price required");

    let err = http(400, r#"{"ok":false,"code":"VALIDATION"}"#);
    assert_eq!(err.user_message("Update failed"), "VALIDATION");

    let err = http(500, "<html>oops</html>");
    assert_eq!(err.user_message("Update failed"), "Update failed");
  }

  #[test]
  fn test_auth_and_conflict_classification() {
    assert!(http(401, "").is_auth_failure());
    assert!(http(403, "").is_auth_failure());
    assert!(!http(404, "").is_auth_failure());
    assert!(http(409, "").is_conflict());
    assert!(!ApiError::rejected(None, "Invalid credentials").is_auth_failure());
  }

  #[test]
  fn test_display_includes_status_and_body() {
    let err = http(409, r#"{"code":"DUPLICATE","message":"slug taken"}"#);
    assert_eq!(err.to_string(), "HTTP 409 Conflict: DUPLICATE: slug taken");
  }
}
