//! The backend's response envelope: `{success, data, pagination?, message?}`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::error::{ApiError, ErrorStatus};

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  #[serde(default = "first_page")]
  pub current_page: u32,
  #[serde(default = "first_page")]
  pub total_pages: u32,
  #[serde(default)]
  pub total_blogs: u64,
  #[serde(default)]
  pub has_next: bool,
  #[serde(default)]
  pub has_prev: bool,
}

fn first_page() -> u32 {
  1
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  #[serde(default = "default_success")]
  pub success: bool,
  pub data: Option<T>,
  pub pagination: Option<Pagination>,
  pub message: Option<String>,
}

fn default_success() -> bool {
  true
}

impl<T: DeserializeOwned> Envelope<T> {
  /// Decode an enveloped body.
  ///
  /// Bodies that are not wrapped in an envelope (a bare array or object without
  /// `data`) are accepted as the data itself.
  pub fn decode(body: Value) -> Result<Self, ApiError> {
    let wrapped = matches!(&body, Value::Object(map) if map.contains_key("data") || map.contains_key("success"));

    if !wrapped {
      let data = serde_json::from_value(body).map_err(|e| ApiError::parsing(200, e))?;
      return Ok(Self {
        success: true,
        data: Some(data),
        pagination: None,
        message: None,
      });
    }

    if body.get("success").and_then(Value::as_bool) == Some(false) {
      return Err(ApiError::new(
        ErrorStatus::Rejected {
          original_status: 200,
        },
        body,
      ));
    }

    serde_json::from_value(body).map_err(|e| ApiError::parsing(200, e))
  }

  /// The `data` field, or a parsing error if the envelope had none.
  pub fn into_data(self) -> Result<T, ApiError> {
    self
      .data
      .ok_or_else(|| ApiError::parsing(200, "response envelope has no data"))
  }
}

/// Decode the `data` field of an enveloped response.
pub fn decode_data<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
  Envelope::<T>::decode(body)?.into_data()
}
