//! Blog post queries and mutations.

use serde_json::{json, Value};

use crate::cache::{MutationEndpoint, QueryEndpoint, Tag, TagKind};
use crate::transport::{ApiError, Envelope, Request};

use super::types::{
  filter_text, Ack, Blog, BlogFilters, BlogInput, BlogPage, BlogStats, FacetArgs, Saved, SetPublished, UpdateBlog,
};
use super::upload::require;

const BLOG: Tag = Tag::of(TagKind::Blog);
const STATS: Tag = Tag::of(TagKind::Stats);

fn blog_tags<'a>(blogs: impl IntoIterator<Item = &'a Blog>) -> Vec<Tag> {
  std::iter::once(BLOG)
    .chain(blogs.into_iter().map(|b| Tag::with_id(TagKind::Blog, &b.id)))
    .collect()
}

fn validate_input(input: &BlogInput) -> Result<(), ApiError> {
  require("Title", &input.title)?;
  require("Content", &input.content)?;
  require("Author", &input.author)?;
  Ok(())
}

/// `GET /blog/getAllblog`, paginated and filtered.
pub struct GetBlogs;

impl QueryEndpoint for GetBlogs {
  type Args = BlogFilters;
  type Output = BlogPage;
  const NAME: &'static str = "getBlogs";

  fn request(f: &BlogFilters) -> Request {
    let mut request = Request::get("/blog/getAllblog")
      .param_opt("page", f.page)
      .param_opt("limit", f.limit)
      .param_opt("search", filter_text(&f.search))
      .param_opt("author", filter_text(&f.author))
      .param_opt("tags", filter_text(&f.tags))
      .param_opt("category", filter_text(&f.category))
      .param_opt("sortBy", filter_text(&f.sort_by))
      .param_opt("dateFrom", f.date_from)
      .param_opt("dateTo", f.date_to)
      .param_opt("published", f.published);
    if f.include_unpublished {
      request = request.param("includeUnpublished", true);
    }
    request
  }

  fn transform(body: Value) -> Result<BlogPage, ApiError> {
    let envelope = Envelope::<Vec<Blog>>::decode(body)?;
    let pagination = envelope.pagination.clone();
    Ok(BlogPage {
      blogs: envelope.into_data()?,
      pagination,
    })
  }

  fn provides_tags(page: &BlogPage, _args: &BlogFilters) -> Vec<Tag> {
    blog_tags(&page.blogs)
  }
}

/// `GET /blog/published`
pub struct GetPublishedBlogs;

impl QueryEndpoint for GetPublishedBlogs {
  type Args = ();
  type Output = Vec<Blog>;
  const NAME: &'static str = "getPublishedBlogs";

  fn request(_args: &()) -> Request {
    Request::get("/blog/published")
  }

  fn provides_tags(blogs: &Vec<Blog>, _args: &()) -> Vec<Tag> {
    blog_tags(blogs)
  }
}

/// `GET /blog/{id}`
pub struct GetBlog;

impl QueryEndpoint for GetBlog {
  type Args = String;
  type Output = Blog;
  const NAME: &'static str = "getBlog";

  fn request(id: &String) -> Request {
    Request::get(format!("/blog/{}", id))
  }

  fn provides_tags(_blog: &Blog, id: &String) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Blog, id)]
  }
}

/// `GET /blog/tags`
pub struct GetTags;

impl QueryEndpoint for GetTags {
  type Args = FacetArgs;
  type Output = Vec<String>;
  const NAME: &'static str = "getTags";

  fn request(args: &FacetArgs) -> Request {
    let request = Request::get("/blog/tags");
    if args.include_unpublished {
      request.param("includeUnpublished", true)
    } else {
      request
    }
  }

  fn provides_tags(_tags: &Vec<String>, _args: &FacetArgs) -> Vec<Tag> {
    vec![BLOG]
  }
}

/// `GET /blog/authors`
pub struct GetAuthors;

impl QueryEndpoint for GetAuthors {
  type Args = FacetArgs;
  type Output = Vec<String>;
  const NAME: &'static str = "getAuthors";

  fn request(args: &FacetArgs) -> Request {
    let request = Request::get("/blog/authors");
    if args.include_unpublished {
      request.param("includeUnpublished", true)
    } else {
      request
    }
  }

  fn provides_tags(_authors: &Vec<String>, _args: &FacetArgs) -> Vec<Tag> {
    vec![BLOG]
  }
}

/// `GET /blog/stats`
pub struct GetBlogStats;

impl QueryEndpoint for GetBlogStats {
  type Args = ();
  type Output = BlogStats;
  const NAME: &'static str = "getBlogStats";

  fn request(_args: &()) -> Request {
    Request::get("/blog/stats")
  }

  fn provides_tags(_stats: &BlogStats, _args: &()) -> Vec<Tag> {
    vec![STATS]
  }
}

/// `POST /blog/create`
pub struct CreateBlog;

impl MutationEndpoint for CreateBlog {
  type Args = BlogInput;
  type Output = Saved<Blog>;
  const NAME: &'static str = "createBlog";

  fn validate(input: &BlogInput) -> Result<(), ApiError> {
    validate_input(input)
  }

  fn request(input: &BlogInput) -> Request {
    Request::post("/blog/create").json(input.to_body())
  }

  fn transform(body: Value) -> Result<Saved<Blog>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Blog>, &ApiError>, _input: &BlogInput) -> Vec<Tag> {
    vec![BLOG, STATS]
  }
}

/// `PUT /blog/{id}`
pub struct UpdateBlogPost;

impl MutationEndpoint for UpdateBlogPost {
  type Args = UpdateBlog;
  type Output = Saved<Blog>;
  const NAME: &'static str = "updateBlog";

  fn validate(args: &UpdateBlog) -> Result<(), ApiError> {
    require("Id", &args.id)?;
    validate_input(&args.input)
  }

  fn request(args: &UpdateBlog) -> Request {
    Request::put(format!("/blog/{}", args.id)).json(args.input.to_body())
  }

  fn transform(body: Value) -> Result<Saved<Blog>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Blog>, &ApiError>, args: &UpdateBlog) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Blog, &args.id), BLOG, STATS]
  }
}

/// `PATCH /blog/{id}/publish`
pub struct TogglePublish;

impl MutationEndpoint for TogglePublish {
  type Args = SetPublished;
  type Output = Saved<Blog>;
  const NAME: &'static str = "togglePublish";

  fn validate(args: &SetPublished) -> Result<(), ApiError> {
    Ok(require("Id", &args.id)?)
  }

  fn request(args: &SetPublished) -> Request {
    Request::patch(format!("/blog/{}/publish", args.id))
      .json(json!({ "isPublished": args.is_published }))
  }

  fn transform(body: Value) -> Result<Saved<Blog>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Blog>, &ApiError>, args: &SetPublished) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Blog, &args.id), BLOG, STATS]
  }
}

/// `DELETE /blog/{id}`
pub struct DeleteBlog;

impl MutationEndpoint for DeleteBlog {
  type Args = String;
  type Output = Ack;
  const NAME: &'static str = "deleteBlog";

  fn validate(id: &String) -> Result<(), ApiError> {
    Ok(require("Id", id)?)
  }

  fn request(id: &String) -> Request {
    Request::delete(format!("/blog/{}", id))
  }

  fn transform(body: Value) -> Result<Ack, ApiError> {
    Ack::decode(body)
  }

  fn invalidates_tags(_result: Result<&Ack, &ApiError>, _id: &String) -> Vec<Tag> {
    vec![BLOG, STATS]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use reqwest::Method;

  fn sample_input() -> BlogInput {
    BlogInput {
      title: "Kyoto".to_string(),
      content: "Temples".to_string(),
      author: "Asha".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_list_request_carries_filters() {
    let filters = BlogFilters {
      page: Some(2),
      limit: Some(10),
      search: Some(" kyoto ".to_string()),
      author: Some(String::new()),
      tags: Some("travel,japan".to_string()),
      date_from: NaiveDate::from_ymd_opt(2024, 1, 5),
      include_unpublished: true,
      ..Default::default()
    };
    let request = GetBlogs::request(&filters);

    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/blog/getAllblog");
    assert_eq!(request.query_value("page"), Some("2"));
    assert_eq!(request.query_value("limit"), Some("10"));
    assert_eq!(request.query_value("search"), Some("kyoto"));
    assert_eq!(request.query_value("author"), None);
    assert_eq!(request.query_value("tags"), Some("travel,japan"));
    assert_eq!(request.query_value("dateFrom"), Some("2024-01-05"));
    assert_eq!(request.query_value("includeUnpublished"), Some("true"));
    assert_eq!(request.query_value("published"), None);
  }

  #[test]
  fn test_list_transform_keeps_pagination() {
    let page = GetBlogs::transform(json!({
      "success": true,
      "data": [{ "_id": "a", "title": "A" }, { "_id": "b", "title": "B" }],
      "pagination": { "currentPage": 1, "totalPages": 4, "totalBlogs": 38, "hasNext": true, "hasPrev": false }
    }))
    .unwrap();

    assert_eq!(page.blogs.len(), 2);
    let pagination = page.pagination.clone().unwrap();
    assert_eq!(pagination.total_pages, 4);
    assert!(pagination.has_next);

    let tags = GetBlogs::provides_tags(&page, &BlogFilters::default());
    assert_eq!(
      tags,
      vec![BLOG, Tag::with_id(TagKind::Blog, "a"), Tag::with_id(TagKind::Blog, "b")]
    );
  }

  #[test]
  fn test_create_requires_title_content_author() {
    assert!(CreateBlog::validate(&sample_input()).is_ok());

    let mut missing = sample_input();
    missing.content = "  ".to_string();
    let err = CreateBlog::validate(&missing).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.message(), "Content is required");
  }

  #[test]
  fn test_update_invalidates_record_list_and_stats() {
    let args = UpdateBlog {
      id: "42".to_string(),
      input: sample_input(),
    };
    let request = UpdateBlogPost::request(&args);
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/blog/42");

    let err = ApiError::http(500, Value::Null);
    let tags = UpdateBlogPost::invalidates_tags(Err(&err), &args);
    assert_eq!(tags, vec![Tag::with_id(TagKind::Blog, "42"), BLOG, STATS]);
  }

  #[test]
  fn test_toggle_publish_body() {
    let request = TogglePublish::request(&SetPublished {
      id: "7".to_string(),
      is_published: false,
    });
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "/blog/7/publish");
    match request.body {
      crate::transport::RequestBody::Json(body) => assert_eq!(body, json!({ "isPublished": false })),
      other => panic!("expected json body, got {:?}", other),
    }
  }

  #[test]
  fn test_facet_requests() {
    let all = FacetArgs {
      include_unpublished: true,
    };
    assert_eq!(GetTags::request(&all).query_value("includeUnpublished"), Some("true"));
    assert_eq!(GetAuthors::request(&FacetArgs::default()).query.len(), 0);
    assert_eq!(GetAuthors::request(&all).path, "/blog/authors");
  }

  #[test]
  fn test_stats_transform() {
    let stats = GetBlogStats::transform(json!({
      "success": true,
      "data": { "totalBlogs": 12, "publishedBlogs": 9, "draftBlogs": 3, "totalAuthors": 4, "totalTags": 20 }
    }))
    .unwrap();
    assert_eq!(stats.draft_blogs, 3);
    assert_eq!(GetBlogStats::provides_tags(&stats, &()), vec![STATS]);
  }

  #[test]
  fn test_delete_accepts_message_only_response() {
    let ack = DeleteBlog::transform(json!({ "success": true, "message": "Blog deleted" })).unwrap();
    assert_eq!(ack.message.as_deref(), Some("Blog deleted"));
    assert!(DeleteBlog::validate(&String::new()).is_err());
  }

  #[test]
  fn test_padded_filters_share_cache_entry() {
    use crate::cache::CacheKey;

    let padded = BlogFilters {
      search: Some(" kyoto ".to_string()),
      category: Some(" c1".to_string()),
      sort_by: Some("-createdAt ".to_string()),
      ..Default::default()
    };
    let clean = BlogFilters {
      search: Some("kyoto".to_string()),
      category: Some("c1".to_string()),
      sort_by: Some("-createdAt".to_string()),
      ..Default::default()
    };
    assert_eq!(
      CacheKey::new(GetBlogs::NAME, &padded),
      CacheKey::new(GetBlogs::NAME, &clean)
    );

    let request = GetBlogs::request(&padded);
    assert_eq!(request.query_value("category"), Some("c1"));
    assert_eq!(request.query_value("sortBy"), Some("-createdAt"));
  }

  #[test]
  fn test_create_accepts_message_only_reply() {
    let saved = CreateBlog::transform(json!({ "success": true, "message": "Blog created" })).unwrap();
    assert_eq!(saved.data, None);
    assert_eq!(saved.message.as_deref(), Some("Blog created"));
  }
}
