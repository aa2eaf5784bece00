use reqwest::Method;
use serde_json::Value;

/// A single request against the backend, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  /// Path below the base URL, always starting with `/`
  pub path: String,
  /// Query string pairs in the order they should be sent
  pub query: Vec<(String, String)>,
  pub body: RequestBody,
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
  #[default]
  Empty,
  Json(Value),
  /// Multipart form; the transport sets the content type and boundary itself
  Multipart(Vec<FormPart>),
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
  Text {
    name: String,
    value: String,
  },
  File {
    name: String,
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
  },
}

impl FormPart {
  pub fn text(name: &str, value: impl Into<String>) -> Self {
    Self::Text {
      name: name.to_string(),
      value: value.into(),
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Self::Text { name, .. } | Self::File { name, .. } => name,
    }
  }
}

impl Request {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: RequestBody::Empty,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::POST, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::PUT, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::PATCH, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::DELETE, path)
  }

  /// Append a query parameter.
  pub fn param(mut self, name: &str, value: impl ToString) -> Self {
    self.query.push((name.to_string(), value.to_string()));
    self
  }

  /// Append a query parameter only when it carries a non-empty value.
  ///
  /// Filters left blank in a form are omitted from the query string entirely.
  pub fn param_opt(self, name: &str, value: Option<impl ToString>) -> Self {
    match value.map(|v| v.to_string()) {
      Some(v) if !v.is_empty() => self.param(name, v),
      _ => self,
    }
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = RequestBody::Json(body);
    self
  }

  pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
    self.body = RequestBody::Multipart(parts);
    self
  }

  /// Whether this request uploads files.
  pub fn is_multipart(&self) -> bool {
    matches!(self.body, RequestBody::Multipart(_))
  }

  /// Value of the named query parameter, if present.
  pub fn query_value(&self, name: &str) -> Option<&str> {
    self
      .query
      .iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }
}

/// A successful (2xx) backend response with its parsed JSON body.
///
/// An empty body is represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
  pub status: u16,
  pub body: Value,
}

impl RawResponse {
  pub fn ok(body: Value) -> Self {
    Self { status: 200, body }
  }
}
