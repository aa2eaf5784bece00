use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::error::ApiError;
use super::request::{FormPart, RawResponse, Request, RequestBody};
use super::Transport;

/// reqwest-backed transport rooted at the configured base URL.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(ApiError::fetch)?;

    Ok(Self { client, base_url })
  }

  /// Resolve a request path and query against the base URL.
  ///
  /// The base URL's own path (e.g. `/api`) is kept; the request path is appended.
  pub fn url_for(&self, request: &Request) -> Result<Url, ApiError> {
    let base = self.base_url.as_str().trim_end_matches('/');
    let path = request.path.trim_start_matches('/');

    let mut url = Url::parse(&format!("{}/{}", base, path))
      .map_err(|e| ApiError::validation(format!("Invalid request URL for {}: {}", request.path, e)))?;

    if !request.query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    Ok(url)
  }

  /// Build the reqwest request without sending it.
  fn build(&self, request: Request) -> Result<reqwest::Request, ApiError> {
    let url = self.url_for(&request)?;
    let builder = self.client.request(request.method, url);

    let builder = match request.body {
      // Uploads must not force a content type; reqwest adds the multipart boundary.
      RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
      RequestBody::Json(body) => builder
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .json(&body),
      RequestBody::Empty => builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json")),
    };

    builder.build().map_err(ApiError::fetch)
  }
}

fn build_form(parts: Vec<FormPart>) -> Result<Form, ApiError> {
  let mut form = Form::new();

  for part in parts {
    form = match part {
      FormPart::Text { name, value } => form.text(name, value),
      FormPart::File {
        name,
        file_name,
        content_type,
        bytes,
      } => {
        let part = Part::bytes(bytes)
          .file_name(file_name)
          .mime_str(&content_type)
          .map_err(|e| ApiError::validation(format!("Invalid content type {}: {}", content_type, e)))?;
        form.part(name, part)
      }
    };
  }

  Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: Request) -> Result<RawResponse, ApiError> {
    let method = request.method.clone();
    let path = request.path.clone();
    let http_request = self.build(request)?;

    debug!(%method, url = %http_request.url(), "sending request");

    let response = self.client.execute(http_request).await.map_err(|e| {
      warn!(%method, %path, error = %e, "request failed before a response arrived");
      ApiError::fetch(e)
    })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(ApiError::fetch)?;

    let body = if bytes.is_empty() {
      Value::Null
    } else {
      match serde_json::from_slice::<Value>(&bytes) {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(ApiError::parsing(status.as_u16(), e)),
        // Error pages are often HTML; keep the text so the caller can still show it.
        Err(_) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
      }
    };

    if !status.is_success() {
      warn!(%method, %path, status = status.as_u16(), "backend returned an error status");
      return Err(ApiError::http(status.as_u16(), body));
    }

    Ok(RawResponse {
      status: status.as_u16(),
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn transport() -> HttpTransport {
    HttpTransport::new(
      Url::parse("http://localhost:8000/api").unwrap(),
      Duration::from_secs(5),
    )
    .unwrap()
  }

  #[test]
  fn test_url_keeps_base_path() {
    let request = Request::get("/blog/getAllblog")
      .param("page", 1)
      .param("search", "hello world");
    let url = transport().url_for(&request).unwrap();
    assert_eq!(
      url.as_str(),
      "http://localhost:8000/api/blog/getAllblog?page=1&search=hello+world"
    );
  }

  #[test]
  fn test_url_with_trailing_slash_base() {
    let transport = HttpTransport::new(
      Url::parse("https://example.com/api/").unwrap(),
      Duration::from_secs(5),
    )
    .unwrap();
    let url = transport.url_for(&Request::get("/categories/42")).unwrap();
    assert_eq!(url.as_str(), "https://example.com/api/categories/42");
  }

  #[test]
  fn test_json_requests_set_content_type() {
    let built = transport()
      .build(Request::post("/blog/create").json(json!({ "title": "T" })))
      .unwrap();
    assert_eq!(
      built.headers().get(CONTENT_TYPE).unwrap(),
      "application/json"
    );
  }

  #[test]
  fn test_get_requests_set_content_type() {
    let built = transport().build(Request::get("/blog/stats")).unwrap();
    assert_eq!(
      built.headers().get(CONTENT_TYPE).unwrap(),
      "application/json"
    );
  }

  #[test]
  fn test_multipart_requests_keep_boundary() {
    let request = Request::post("/blog/upload-image").multipart(vec![FormPart::File {
      name: "image".to_string(),
      file_name: "cat.png".to_string(),
      content_type: "image/png".to_string(),
      bytes: vec![1, 2, 3],
    }]);
    let built = transport().build(request).unwrap();
    let content_type = built
      .headers()
      .get(CONTENT_TYPE)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
  }
}
