//! HTTP transport for the admin backend.
//!
//! This module knows nothing about caching. It turns a [`Request`] into a
//! [`RawResponse`] and folds every failure (no response, non-2xx status,
//! unparseable body) into the uniform [`ApiError`] shape.

mod envelope;
mod error;
mod http;
#[cfg(test)]
pub mod mock;
mod request;

use async_trait::async_trait;

pub use envelope::{decode_data, Envelope, Pagination};
pub use error::{ApiError, ErrorStatus};
pub use http::HttpTransport;
pub use request::{FormPart, RawResponse, Request};
#[cfg(test)]
pub use request::RequestBody;

/// Something that can deliver a request to the backend.
///
/// Implementations never panic on backend failures; every failure is returned
/// as an [`ApiError`].
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: Request) -> Result<RawResponse, ApiError>;
}
