//! Domain models for blog posts, categories and places.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::transport::{ApiError, Envelope, Pagination};

fn default_true() -> bool {
  true
}

fn is_blank(value: &Option<String>) -> bool {
  filter_text(value).is_none()
}

fn trimmed<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(filter_text(value).unwrap_or_default())
}

/// A free-text filter with surrounding whitespace removed, or `None` when blank.
pub fn filter_text(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Blog posts
// ============================================================================

/// Image attached to a post, as returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogImage {
  pub url: String,
  #[serde(alias = "id", default)]
  pub file_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

/// A post's category, either populated or as a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
  Populated {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
  },
  Id(String),
}

impl CategoryRef {
  pub fn id(&self) -> &str {
    match self {
      Self::Populated { id, .. } | Self::Id(id) => id,
    }
  }

  pub fn label(&self) -> &str {
    match self {
      Self::Populated { name: Some(name), .. } => name,
      other => other.id(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub author: String,
  #[serde(default)]
  pub category: Option<CategoryRef>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub images: Vec<BlogImage>,
  #[serde(default = "default_true")]
  pub is_published: bool,
  #[serde(default)]
  pub published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

/// One page of the post list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPage {
  pub blogs: Vec<Blog>,
  pub pagination: Option<Pagination>,
}

impl BlogPage {
  /// Remove a post from this page locally. Returns whether it was present.
  pub fn remove(&mut self, id: &str) -> bool {
    let before = self.blogs.len();
    self.blogs.retain(|b| b.id != id);
    self.blogs.len() != before
  }
}

/// The page a list should show after deleting from `page`, leaving `remaining` posts on it.
///
/// An emptied page other than the first steps back one page.
pub fn page_after_removal(remaining: usize, page: u32) -> u32 {
  if remaining == 0 && page > 1 {
    page - 1
  } else {
    page
  }
}

/// Query arguments for the post list. Text filters are trimmed, and blank ones
/// are left out of both the request and the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFilters {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u32>,
  #[serde(skip_serializing_if = "is_blank", serialize_with = "trimmed")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "is_blank", serialize_with = "trimmed")]
  pub author: Option<String>,
  /// Comma-separated tag list
  #[serde(skip_serializing_if = "is_blank", serialize_with = "trimmed")]
  pub tags: Option<String>,
  #[serde(skip_serializing_if = "is_blank", serialize_with = "trimmed")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "is_blank", serialize_with = "trimmed")]
  pub sort_by: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date_from: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date_to: Option<NaiveDate>,
  pub include_unpublished: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published: Option<bool>,
}

/// Arguments for the tag and author listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetArgs {
  pub include_unpublished: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogStats {
  #[serde(default)]
  pub total_blogs: u64,
  #[serde(default)]
  pub published_blogs: u64,
  #[serde(default)]
  pub draft_blogs: u64,
  #[serde(default)]
  pub total_authors: u64,
  #[serde(default)]
  pub total_tags: u64,
}

/// Fields for creating or replacing a post.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogInput {
  pub title: String,
  pub content: String,
  pub author: String,
  pub category: Option<String>,
  pub tags: Vec<String>,
  pub images: Vec<BlogImage>,
  pub is_published: bool,
  pub published_at: Option<DateTime<Utc>>,
}

impl Default for BlogInput {
  fn default() -> Self {
    Self {
      title: String::new(),
      content: String::new(),
      author: String::new(),
      category: None,
      tags: Vec::new(),
      images: Vec::new(),
      is_published: true,
      published_at: None,
    }
  }
}

impl BlogImage {
  fn to_json(&self) -> Value {
    let mut image = Map::new();
    image.insert("url".to_string(), Value::from(self.url.as_str()));
    image.insert("fileId".to_string(), Value::from(self.file_id.as_str()));
    if let Some(name) = &self.name {
      image.insert("name".to_string(), Value::from(name.as_str()));
    }
    Value::Object(image)
  }
}

impl BlogInput {
  /// JSON body for the create and update requests. A blank category is left out.
  pub fn to_body(&self) -> Value {
    let mut body = Map::new();
    body.insert("title".to_string(), Value::from(self.title.as_str()));
    body.insert("content".to_string(), Value::from(self.content.as_str()));
    body.insert("author".to_string(), Value::from(self.author.as_str()));
    if let Some(category) = filter_text(&self.category) {
      body.insert("category".to_string(), Value::from(category));
    }
    body.insert("tags".to_string(), Value::from(self.tags.clone()));
    body.insert(
      "images".to_string(),
      Value::Array(self.images.iter().map(BlogImage::to_json).collect()),
    );
    body.insert("isPublished".to_string(), Value::from(self.is_published));
    if let Some(at) = self.published_at {
      body.insert(
        "publishedAt".to_string(),
        Value::from(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
      );
    }
    Value::Object(body)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBlog {
  pub id: String,
  pub input: BlogInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetPublished {
  pub id: String,
  pub is_published: bool,
}

/// Split comma-separated tag input, trimming whitespace and dropping empties.
pub fn parse_tag_list(input: &str) -> Vec<String> {
  input
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(String::from)
    .collect()
}

/// Acknowledgement for operations that return no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
  pub message: Option<String>,
}

impl Ack {
  pub fn decode(body: Value) -> Result<Self, ApiError> {
    let envelope = Envelope::<Value>::decode(body)?;
    Ok(Self {
      message: envelope.message,
    })
  }
}

/// Outcome of a write the backend accepted.
///
/// Depending on the route the backend answers with the saved record, some
/// other payload, or only a message. A payload that does not decode as `T` is
/// dropped rather than failing a write that already happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saved<T> {
  pub data: Option<T>,
  pub message: Option<String>,
}

impl<T: DeserializeOwned> Saved<T> {
  pub fn decode(body: Value) -> Result<Self, ApiError> {
    let envelope = Envelope::<Value>::decode(body)?;
    let data = envelope
      .data
      .filter(|v| !v.is_null())
      .and_then(|v| match serde_json::from_value(v) {
        Ok(data) => Some(data),
        Err(error) => {
          debug!(%error, "write response carried an unexpected payload");
          None
        }
      });

    Ok(Self {
      data,
      message: envelope.message,
    })
  }
}

// ============================================================================
// Categories and places
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub location: String,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub category: Option<CategoryRef>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

/// A category's place, either populated or as a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceRef {
  Populated(Place),
  Id(String),
}

impl PlaceRef {
  pub fn id(&self) -> &str {
    match self {
      Self::Populated(place) => &place.id,
      Self::Id(id) => id,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  #[serde(rename = "_id")]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category_type: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub places: Vec<PlaceRef>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

/// Partial category update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChanges {
  pub name: Option<String>,
  pub description: Option<String>,
  pub category_type: Option<String>,
}

impl CategoryChanges {
  pub fn to_body(&self) -> Value {
    let fields = [
      ("name", &self.name),
      ("description", &self.description),
      ("categoryType", &self.category_type),
    ];
    let body = fields
      .into_iter()
      .filter_map(|(field, value)| Some((field.to_string(), Value::from(value.as_deref()?))))
      .collect::<Map<String, Value>>();
    Value::Object(body)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCategory {
  pub id: String,
  pub changes: CategoryChanges,
}
