//! Serde types and helpers matching the storefront API's wire format.
//!
//! Every response is wrapped in an `{ok, data}` envelope; failures carry
//! `{ok: false, code, message}`. Numeric fields are not reliably typed by the
//! backend, so the deserializers here accept numbers and numeric strings.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ErrorBody};

/// Fail with [`ApiError::Rejected`] when the envelope says `ok: false`.
pub fn check_envelope(raw: &Value) -> Result<(), ApiError> {
  if raw.get("ok").and_then(Value::as_bool) == Some(false) {
    let body: ErrorBody = serde_json::from_value(raw.clone()).unwrap_or_default();
    return Err(ApiError::Rejected(body));
  }
  Ok(())
}

/// Unwrap the `data` member of an envelope, or the whole value if it has none.
pub fn into_data<T: DeserializeOwned>(raw: Value) -> Result<T, ApiError> {
  check_envelope(&raw)?;
  let data = match raw {
    Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or_default(),
    other => other,
  };
  Ok(serde_json::from_value(data)?)
}

/// Coerce a JSON number or numeric string.
pub fn coerce_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
  .filter(|n| n.is_finite())
}

// ============================================================================
// Auth endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
  #[serde(rename = "accessToken")]
  pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
  #[serde(default)]
  pub ok: bool,
  pub data: Option<LoginData>,
  pub code: Option<String>,
}

// ============================================================================
// Mutation acknowledgements
// ============================================================================

/// Response to a create call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Created {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub slug: Option<String>,
}

/// Response to a delete call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Deleted {
  #[serde(alias = "_id")]
  pub id: String,
}

impl Deleted {
  /// Read the acknowledgement, falling back to the requested id when the
  /// server sends no usable body (e.g. 204).
  pub fn from_response(raw: Value, requested: &str) -> Result<Self, ApiError> {
    if raw.is_null() {
      return Ok(Self {
        id: requested.to_string(),
      });
    }
    match into_data::<Deleted>(raw) {
      Ok(deleted) => Ok(deleted),
      Err(ApiError::Decode(_)) => Ok(Self {
        id: requested.to_string(),
      }),
      Err(e) => Err(e),
    }
  }
}

// ============================================================================
// Lenient numeric deserializers
// ============================================================================

pub mod de {
  use super::*;
  use serde::de::Error;

  pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    coerce_number(&value).ok_or_else(|| D::Error::custom(format!("expected a number, got {}", value)))
  }

  pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
  }

  pub fn opt_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(opt_number(deserializer)?.map(|n| n.round() as i64))
  }

  pub fn integer<'de, D>(deserializer: D) -> Result<u32, D::Error>
  where
    D: Deserializer<'de>,
  {
    let n = number(deserializer)?;
    if n < 0.0 {
      return Err(D::Error::custom(format!("expected a non-negative integer, got {}", n)));
    }
    Ok(n.round() as u32)
  }
}
