//! Image files and the upload endpoint.

use serde_json::json;
use std::path::Path;
use thiserror::Error;

use crate::cache::{MutationEndpoint, Tag};
use crate::transport::{ApiError, ErrorStatus, FormPart, Request};

use super::types::BlogImage;

/// Largest image the backend accepts.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Client-side input checks that run before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("File {name} is too large. Maximum size is 5MB.")]
  ImageTooLarge { name: String, size: usize },
  #[error("File {name} is not a valid image.")]
  NotAnImage { name: String },
  #[error("{0} is required")]
  MissingField(&'static str),
}

impl From<ValidationError> for ApiError {
  fn from(error: ValidationError) -> Self {
    let field = match &error {
      ValidationError::MissingField(field) => Some(*field),
      _ => None,
    };
    ApiError::new(
      ErrorStatus::Validation,
      json!({ "message": error.to_string(), "field": field }),
    )
  }
}

/// Reject a blank required text field.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::MissingField(field));
  }
  Ok(())
}

/// An image selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

impl ImageFile {
  pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      file_name: file_name.into(),
      content_type: content_type.into(),
      bytes,
    }
  }

  /// Read a file from disk, inferring its content type from the extension.
  pub async fn read(path: &Path) -> std::io::Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "image".to_string());
    Ok(Self::new(file_name, content_type_for(path), bytes))
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if !self.content_type.starts_with("image/") {
      return Err(ValidationError::NotAnImage {
        name: self.file_name.clone(),
      });
    }
    if self.bytes.len() > MAX_IMAGE_BYTES {
      return Err(ValidationError::ImageTooLarge {
        name: self.file_name.clone(),
        size: self.bytes.len(),
      });
    }
    Ok(())
  }

  pub fn to_part(&self, field: &str) -> FormPart {
    FormPart::File {
      name: field.to_string(),
      file_name: self.file_name.clone(),
      content_type: self.content_type.clone(),
      bytes: self.bytes.clone(),
    }
  }
}

fn content_type_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .map(|e| e.to_string_lossy().to_ascii_lowercase())
    .unwrap_or_default();
  match ext.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "svg" => "image/svg+xml",
    "bmp" => "image/bmp",
    "avif" => "image/avif",
    _ => "application/octet-stream",
  }
}

/// `POST /blog/upload-image`
pub struct UploadImage;

impl MutationEndpoint for UploadImage {
  type Args = ImageFile;
  type Output = BlogImage;
  const NAME: &'static str = "uploadImage";

  fn validate(image: &ImageFile) -> Result<(), ApiError> {
    Ok(image.validate()?)
  }

  fn request(image: &ImageFile) -> Request {
    Request::post("/blog/upload-image").multipart(vec![image.to_part("image")])
  }

  fn invalidates_tags(_result: Result<&BlogImage, &ApiError>, _image: &ImageFile) -> Vec<Tag> {
    Vec::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSettings, QueryStore};
  use crate::transport::mock::MockTransport;
  use crate::transport::{RawResponse, RequestBody};
  use std::sync::Arc;

  fn uploader() -> MockTransport {
    MockTransport::new(|_| {
      Ok(RawResponse::ok(json!({
        "success": true,
        "data": { "url": "https://cdn/a.png", "fileId": "f-1", "name": "a.png" }
      })))
    })
  }

  #[test]
  fn test_size_limit_is_inclusive() {
    let at_limit = ImageFile::new("a.png", "image/png", vec![0; MAX_IMAGE_BYTES]);
    assert!(at_limit.validate().is_ok());

    let over = ImageFile::new("b.png", "image/png", vec![0; MAX_IMAGE_BYTES + 1]);
    assert_eq!(
      over.validate(),
      Err(ValidationError::ImageTooLarge {
        name: "b.png".to_string(),
        size: MAX_IMAGE_BYTES + 1
      })
    );
  }

  #[test]
  fn test_rejects_non_images() {
    let pdf = ImageFile::new("cv.pdf", "application/pdf", vec![1, 2, 3]);
    let err = ApiError::from(pdf.validate().unwrap_err());
    assert!(err.is_validation());
    assert_eq!(err.message(), "File cv.pdf is not a valid image.");
  }

  #[test]
  fn test_missing_field_names_the_field() {
    let err = ApiError::from(require("Title", "  ").unwrap_err());
    assert_eq!(err.message(), "Title is required");
    assert_eq!(err.data["field"], "Title");
  }

  #[test]
  fn test_content_type_from_extension() {
    assert_eq!(content_type_for(Path::new("x/photo.JPG")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("logo.svg")), "image/svg+xml");
    assert_eq!(content_type_for(Path::new("notes.txt")), "application/octet-stream");
    assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
  }

  #[tokio::test]
  async fn test_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.webp");
    std::fs::write(&path, [7u8; 16]).unwrap();

    let image = ImageFile::read(&path).await.unwrap();
    assert_eq!(image.file_name, "shot.webp");
    assert_eq!(image.content_type, "image/webp");
    assert_eq!(image.bytes.len(), 16);
  }

  #[tokio::test]
  async fn test_upload_sends_image_field() {
    let transport = uploader();
    let store = QueryStore::new(Arc::new(transport.clone()), CacheSettings::default());

    let uploaded = store
      .mutate::<UploadImage>(ImageFile::new("a.png", "image/png", vec![1; 10]))
      .await
      .unwrap();
    assert_eq!(uploaded.file_id, "f-1");

    let requests = transport.requests();
    assert_eq!(requests[0].path, "/blog/upload-image");
    match &requests[0].body {
      RequestBody::Multipart(parts) => {
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "image");
      }
      other => panic!("expected multipart body, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_oversized_upload_never_sent() {
    let transport = uploader();
    let store = QueryStore::new(Arc::new(transport.clone()), CacheSettings::default());

    let err = store
      .mutate::<UploadImage>(ImageFile::new("big.jpg", "image/jpeg", vec![0; MAX_IMAGE_BYTES + 1]))
      .await
      .unwrap_err();

    assert_eq!(err.status, ErrorStatus::Validation);
    assert_eq!(err.message(), "File big.jpg is too large. Maximum size is 5MB.");
    assert_eq!(transport.call_count(), 0);
  }
}
