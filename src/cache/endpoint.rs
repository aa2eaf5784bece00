//! Endpoint descriptors.
//!
//! Each backend operation is a type implementing one of these traits. The
//! descriptor owns everything the cache needs to know: how to build the
//! request, how to decode the response, and which tags it provides or
//! invalidates.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::transport::{decode_data, ApiError, Request};

use super::tags::Tag;

/// A read operation whose results are cached.
pub trait QueryEndpoint: Send + Sync + 'static {
  /// Arguments; their serialized form is part of the cache key.
  type Args: Serialize + Clone + Send + Sync + 'static;
  type Output: DeserializeOwned + Send + Sync + 'static;

  /// Unique endpoint name.
  const NAME: &'static str;

  fn request(args: &Self::Args) -> Request;

  /// Decode the response body. Defaults to the envelope's `data` field.
  fn transform(body: Value) -> Result<Self::Output, ApiError> {
    decode_data(body)
  }

  /// Tags this result depends on, evaluated after each successful fetch.
  fn provides_tags(result: &Self::Output, args: &Self::Args) -> Vec<Tag>;
}

/// A write operation. Results are never cached.
pub trait MutationEndpoint: Send + Sync + 'static {
  type Args: Send + Sync;
  type Output: DeserializeOwned + Clone + Send + Sync + 'static;

  const NAME: &'static str;

  /// Client-side checks run before anything is sent.
  fn validate(_args: &Self::Args) -> Result<(), ApiError> {
    Ok(())
  }

  fn request(args: &Self::Args) -> Request;

  fn transform(body: Value) -> Result<Self::Output, ApiError> {
    decode_data(body)
  }

  /// Tags to invalidate once the request completed, successfully or not.
  fn invalidates_tags(result: Result<&Self::Output, &ApiError>, args: &Self::Args) -> Vec<Tag>;
}
