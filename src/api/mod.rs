//! The blog and travel-places backend: models and endpoint descriptors.

mod blogs;
mod categories;
mod places;
mod types;
mod upload;

pub use blogs::{
  CreateBlog, DeleteBlog, GetAuthors, GetBlog, GetBlogStats, GetBlogs, GetPublishedBlogs, GetTags,
  TogglePublish, UpdateBlogPost,
};
pub use categories::{
  CategoryInput, CreateCategory, DeleteCategory, GetCategories, GetCategory, UpdateCategoryDetails,
};
pub use places::{AddPlace, DeletePlace, GetPlace, PlaceInput};
pub use types::{
  page_after_removal, parse_tag_list, Blog, BlogFilters, BlogImage, BlogInput, BlogPage, Category,
  CategoryChanges, FacetArgs, Place, PlaceRef, Saved, SetPublished, UpdateBlog, UpdateCategory,
};
pub use upload::{ImageFile, UploadImage};

/// Default page size of the post list.
pub const PAGE_SIZE: u32 = 10;

#[cfg(test)]
mod tests {
  use super::*;
  use super::upload::MAX_IMAGE_BYTES;
  use crate::cache::{CacheSettings, QueryStore};
  use crate::transport::mock::MockTransport;
  use crate::transport::{ApiError, ErrorStatus, RawResponse, Request, RequestBody};
  use futures::future::try_join_all;
  use reqwest::Method;
  use serde_json::{json, Value};
  use std::sync::{Arc, Mutex};

  /// In-memory stand-in for the blog backend.
  fn blog_backend(seed: usize) -> MockTransport {
    let posts: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(
      (1..=seed)
        .map(|i| json!({ "_id": format!("b{}", i), "title": format!("post {}", i) }))
        .collect(),
    ));
    let next_id = Arc::new(Mutex::new(seed));

    MockTransport::new(move |request: &Request| {
      let mut posts = posts.lock().unwrap();
      match (request.method.clone(), request.path.as_str()) {
        (Method::GET, "/blog/getAllblog") => {
          let page: usize = request.query_value("page").and_then(|p| p.parse().ok()).unwrap_or(1);
          let limit: usize = request.query_value("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
          let total_pages = ((posts.len() + limit - 1) / limit).max(1);
          let data: Vec<Value> = posts.iter().skip((page - 1) * limit).take(limit).cloned().collect();
          Ok(RawResponse::ok(json!({
            "success": true,
            "data": data,
            "pagination": {
              "currentPage": page,
              "totalPages": total_pages,
              "totalBlogs": posts.len(),
              "hasNext": page < total_pages,
              "hasPrev": page > 1
            }
          })))
        }
        (Method::GET, "/blog/stats") => Ok(RawResponse::ok(json!({
          "success": true,
          "data": { "totalBlogs": posts.len(), "publishedBlogs": posts.len() }
        }))),
        (Method::POST, "/blog/create") => {
          let RequestBody::Json(body) = &request.body else {
            return Err(ApiError::http(400, json!({ "message": "expected json" })));
          };
          let mut id = next_id.lock().unwrap();
          *id += 1;
          let mut post = body.clone();
          post["_id"] = json!(format!("b{}", *id));
          posts.push(post.clone());
          Ok(RawResponse::ok(json!({ "success": true, "data": post })))
        }
        (Method::POST, "/blog/upload-image") => Ok(RawResponse::ok(json!({
          "success": true,
          "data": { "url": "https://cdn/img.png", "fileId": "f1" }
        }))),
        (Method::DELETE, path) => {
          let id = path.trim_start_matches("/blog/");
          let before = posts.len();
          posts.retain(|p| p["_id"] != id);
          if posts.len() == before {
            return Err(ApiError::http(404, json!({ "success": false, "message": "Blog not found" })));
          }
          Ok(RawResponse::ok(json!({ "success": true, "message": "Blog deleted" })))
        }
        _ => Err(ApiError::http(404, json!({ "message": "no route" }))),
      }
    })
  }

  fn store_for(transport: &MockTransport) -> QueryStore {
    QueryStore::new(Arc::new(transport.clone()), CacheSettings::default())
  }

  fn page(n: u32) -> BlogFilters {
    BlogFilters {
      page: Some(n),
      limit: Some(PAGE_SIZE),
      ..Default::default()
    }
  }

  fn new_post(title: &str) -> BlogInput {
    BlogInput {
      title: title.to_string(),
      content: "body".to_string(),
      author: "Asha".to_string(),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_created_post_appears_in_subscribed_list() {
    let transport = blog_backend(3);
    let store = store_for(&transport);

    let mut list = store.subscribe::<GetBlogs>(page(1));
    let mut stats = store.subscribe::<GetBlogStats>(());
    assert_eq!(list.settled().await.data().map(|p| p.blogs.len()), Some(3));
    assert_eq!(stats.settled().await.data().map(|s| s.total_blogs), Some(3));

    let created = store.mutate::<CreateBlog>(new_post("fresh")).await.unwrap();
    assert_eq!(created.data.as_ref().map(|b| b.id.as_str()), Some("b4"));

    let refreshed = list.settled().await;
    let titles: Vec<String> = refreshed
      .data()
      .map(|p| p.blogs.iter().map(|b| b.title.clone()).collect())
      .unwrap_or_default();
    assert!(titles.contains(&"fresh".to_string()));
    assert_eq!(stats.settled().await.data().map(|s| s.total_blogs), Some(4));
    assert_eq!(transport.calls_to("/blog/getAllblog"), 2);
  }

  #[tokio::test]
  async fn test_deleting_last_post_on_page_steps_back() {
    let transport = blog_backend(11);
    let store = store_for(&transport);

    let mut second = store.subscribe::<GetBlogs>(page(2));
    let mut shown = second.settled().await.data().cloned().unwrap();
    assert_eq!(shown.blogs.len(), 1);
    let target = shown.blogs[0].id.clone();

    store.mutate::<DeleteBlog>(target.clone()).await.unwrap();
    shown.remove(&target);
    assert_eq!(page_after_removal(shown.blogs.len(), 2), 1);

    let refetched = second.settled().await;
    assert_eq!(refetched.data().map(|p| p.blogs.len()), Some(0));
    assert_eq!(transport.calls_to("/blog/getAllblog"), 2);

    let first = store.query::<GetBlogs>(page(1)).await.unwrap();
    assert_eq!(first.blogs.len(), 10);
  }

  #[tokio::test]
  async fn test_failed_delete_still_revalidates() {
    let transport = blog_backend(2);
    let store = store_for(&transport);

    let mut list = store.subscribe::<GetBlogs>(page(1));
    list.settled().await;

    let err = store.mutate::<DeleteBlog>("missing".to_string()).await.unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(404));
    assert_eq!(err.message(), "Blog not found");

    list.settled().await;
    assert_eq!(transport.calls_to("/blog/getAllblog"), 2);
  }

  #[tokio::test]
  async fn test_oversized_image_blocks_post_creation() {
    let transport = blog_backend(0);
    let store = store_for(&transport);

    let images = vec![
      ImageFile::new("ok.png", "image/png", vec![0; 1024]),
      ImageFile::new("huge.png", "image/png", vec![0; MAX_IMAGE_BYTES + 1]),
    ];
    let uploads = try_join_all(images.into_iter().map(|image| {
      let store = store.clone();
      async move { store.mutate::<UploadImage>(image).await }
    }))
    .await;

    let err = uploads.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(transport.calls_to("/blog/create"), 0);
    assert!(transport.calls_to("/blog/upload-image") <= 1);
  }

  #[tokio::test]
  async fn test_uploaded_images_attach_to_post() {
    let transport = blog_backend(0);
    let store = store_for(&transport);

    let image = store
      .mutate::<UploadImage>(ImageFile::new("a.png", "image/png", vec![1; 4]))
      .await
      .unwrap();
    let mut input = new_post("with image");
    input.images.push(image);

    let created = store.mutate::<CreateBlog>(input).await.unwrap();
    let blog = created.data.unwrap();
    assert_eq!(blog.images.len(), 1);
    assert_eq!(blog.images[0].url, "https://cdn/img.png");
  }
}
