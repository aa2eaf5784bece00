//! Subcommands of the `pressroom` admin client.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::api::{
  page_after_removal, parse_tag_list, AddPlace, Blog, BlogFilters, BlogImage, BlogInput, BlogPage,
  Category, CategoryChanges, CategoryInput, CreateBlog, CreateCategory, DeleteBlog, DeleteCategory,
  DeletePlace, FacetArgs, GetAuthors, GetBlog, GetBlogStats, GetBlogs, GetCategories, GetCategory,
  GetPlace, GetPublishedBlogs, GetTags, ImageFile, Place, PlaceInput, PlaceRef, Saved, SetPublished,
  TogglePublish, UpdateBlog, UpdateBlogPost, UpdateCategory, UpdateCategoryDetails, UploadImage,
  PAGE_SIZE,
};
use crate::cache::{QuerySnapshot, QueryStore, SubscribeOptions};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Blog posts
  #[command(subcommand)]
  Blogs(BlogCommand),
  /// Travel categories
  #[command(subcommand)]
  Categories(CategoryCommand),
  /// Places inside categories
  #[command(subcommand)]
  Places(PlaceCommand),
  /// Upload an image and print its URL
  Upload { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum BlogCommand {
  /// List posts, one page at a time
  List(ListArgs),
  /// Published posts only, as shown on the public site
  Published,
  /// Show one post
  Show {
    id: String,
    /// Bypass cached data
    #[arg(long)]
    fresh: bool,
  },
  Create(PostArgs),
  /// Replace a post; fields not given keep their current value
  Update {
    id: String,
    #[command(flatten)]
    post: PostArgs,
  },
  /// Publish a post, or unpublish it with --unpublish
  Publish {
    id: String,
    #[arg(long)]
    unpublish: bool,
  },
  /// Delete a post and report the page the list should show afterwards
  Delete {
    id: String,
    /// List page the post is shown on
    #[arg(long, default_value_t = 1)]
    page: u32,
  },
  Tags {
    #[arg(long)]
    include_unpublished: bool,
  },
  Authors {
    #[arg(long)]
    include_unpublished: bool,
  },
  Stats,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
  #[arg(long, default_value_t = 1)]
  pub page: u32,
  #[arg(long, default_value_t = PAGE_SIZE)]
  pub limit: u32,
  #[arg(long)]
  pub search: Option<String>,
  #[arg(long)]
  pub author: Option<String>,
  /// Comma-separated tags
  #[arg(long)]
  pub tags: Option<String>,
  #[arg(long)]
  pub category: Option<String>,
  /// Sort field, e.g. `createdAt` or `-title`
  #[arg(long)]
  pub sort_by: Option<String>,
  #[arg(long)]
  pub published: Option<bool>,
  /// Created on or after (YYYY-MM-DD)
  #[arg(long = "from")]
  pub date_from: Option<NaiveDate>,
  /// Created on or before (YYYY-MM-DD)
  #[arg(long = "to")]
  pub date_to: Option<NaiveDate>,
  #[arg(long)]
  pub include_unpublished: bool,
}

impl From<ListArgs> for BlogFilters {
  fn from(args: ListArgs) -> Self {
    Self {
      page: Some(args.page),
      limit: Some(args.limit),
      search: args.search,
      author: args.author,
      tags: args.tags,
      category: args.category,
      sort_by: args.sort_by,
      date_from: args.date_from,
      date_to: args.date_to,
      include_unpublished: args.include_unpublished,
      published: args.published,
    }
  }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PostArgs {
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub content: Option<String>,
  /// Read the content from a file
  #[arg(long, conflicts_with = "content")]
  pub content_file: Option<PathBuf>,
  #[arg(long)]
  pub author: Option<String>,
  /// Category id
  #[arg(long)]
  pub category: Option<String>,
  /// Comma-separated tags
  #[arg(long)]
  pub tags: Option<String>,
  /// Image to upload and attach; repeatable
  #[arg(long = "image")]
  pub images: Vec<PathBuf>,
  /// Save as a draft instead of publishing
  #[arg(long)]
  pub draft: bool,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  List,
  /// Show a category with its places
  Show { id: String },
  Create {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long = "type", default_value = "general")]
    category_type: String,
    #[arg(long)]
    image: PathBuf,
  },
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long = "type")]
    category_type: Option<String>,
  },
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PlaceCommand {
  Show { id: String },
  Add {
    #[arg(long)]
    category: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    location: String,
    #[arg(long)]
    image: PathBuf,
  },
  Delete { id: String },
}

/// Renders results as text or pretty JSON.
struct Output {
  json: bool,
}

impl Output {
  fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if self.json {
      println!("{}", serde_json::to_string_pretty(value)?);
    } else {
      println!("{}", text(value));
    }
    Ok(())
  }
}

pub async fn run(command: Command, store: &QueryStore, json: bool) -> Result<()> {
  let out = Output { json };
  match command {
    Command::Blogs(cmd) => run_blogs(cmd, store, &out).await,
    Command::Categories(cmd) => run_categories(cmd, store, &out).await,
    Command::Places(cmd) => run_places(cmd, store, &out).await,
    Command::Upload { path } => {
      let image = ImageFile::read(&path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
      let uploaded = store.mutate::<UploadImage>(image).await?;
      out.emit(&uploaded, |i| format!("{} ({})", i.url, i.file_id))
    }
  }
}

async fn run_blogs(cmd: BlogCommand, store: &QueryStore, out: &Output) -> Result<()> {
  match cmd {
    BlogCommand::List(args) => {
      let page = store.query::<GetBlogs>(args.into()).await?;
      out.emit(page.as_ref(), render_page)
    }
    BlogCommand::Published => {
      let blogs = store.query::<GetPublishedBlogs>(()).await?;
      out.emit(blogs.as_ref(), |bs| {
        bs.iter().map(render_blog_line).collect::<Vec<_>>().join("\n")
      })
    }
    BlogCommand::Show { id, fresh } => {
      let mut sub = store.subscribe_with::<GetBlog>(
        id,
        SubscribeOptions {
          refetch_on_mount: fresh,
        },
      );
      let blog = sub.settled().await.into_result()?;
      out.emit(blog.as_ref(), render_blog_detail)
    }
    BlogCommand::Create(post) => {
      let input = post_input(store, post, BlogInput::default()).await?;
      let created = store.mutation::<CreateBlog>().trigger(input).await?;
      out.emit(&created, |s| render_saved(s, "Created", render_blog_line))
    }
    BlogCommand::Update { id, post } => {
      let current = store.query::<GetBlog>(id.clone()).await?;
      let base = BlogInput {
        title: current.title.clone(),
        content: current.content.clone(),
        author: current.author.clone(),
        category: current.category.as_ref().map(|c| c.id().to_string()),
        tags: current.tags.clone(),
        images: current.images.clone(),
        is_published: current.is_published,
        published_at: current.published_at,
      };
      let input = post_input(store, post, base).await?;
      let updated = store.mutate::<UpdateBlogPost>(UpdateBlog { id, input }).await?;
      out.emit(&updated, |s| render_saved(s, "Updated", render_blog_line))
    }
    BlogCommand::Publish { id, unpublish } => {
      let saved = store
        .mutate::<TogglePublish>(SetPublished {
          id,
          is_published: !unpublish,
        })
        .await?;
      let verb = if unpublish { "Unpublished" } else { "Published" };
      out.emit(&saved, |s| render_saved(s, verb, render_blog_line))
    }
    BlogCommand::Delete { id, page } => delete_blog(store, out, id, page).await,
    BlogCommand::Tags {
      include_unpublished,
    } => {
      let tags = store.query::<GetTags>(FacetArgs { include_unpublished }).await?;
      out.emit(tags.as_ref(), |t| t.join("\n"))
    }
    BlogCommand::Authors {
      include_unpublished,
    } => {
      let authors = store.query::<GetAuthors>(FacetArgs { include_unpublished }).await?;
      out.emit(authors.as_ref(), |a| a.join("\n"))
    }
    BlogCommand::Stats => {
      let stats = store.query::<GetBlogStats>(()).await?;
      out.emit(stats.as_ref(), |s| {
        format!(
          "posts: {} ({} published, {} drafts)\nauthors: {}\ntags: {}",
          s.total_blogs, s.published_blogs, s.draft_blogs, s.total_authors, s.total_tags
        )
      })
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Deleted {
  id: String,
  message: Option<String>,
  page: u32,
  remaining_on_page: usize,
}

async fn delete_blog(store: &QueryStore, out: &Output, id: String, page: u32) -> Result<()> {
  let deleted = delete_from_page(store, id, page).await?;
  out.emit(&deleted, |d| {
    format!(
      "{}\nshowing page {} ({} posts)",
      d.message.as_deref().unwrap_or("Deleted"),
      d.page,
      d.remaining_on_page
    )
  })
}

/// Delete while the list page stays subscribed, then work out where the list lands.
async fn delete_from_page(store: &QueryStore, id: String, page: u32) -> Result<Deleted> {
  let filters = BlogFilters {
    page: Some(page),
    limit: Some(PAGE_SIZE),
    ..Default::default()
  };
  let mut list = store.subscribe::<GetBlogs>(filters);
  let shown = list.settled().await.into_result()?;

  let ack = store.mutate::<DeleteBlog>(id.clone()).await?;

  let mut local = shown.as_ref().clone();
  local.remove(&id);
  let refreshed = list.settled().await;
  let remaining = remaining_on_page(&refreshed, &local);
  let next_page = page_after_removal(remaining, page);
  info!(id = %id, page, next_page, remaining, "deleted post");

  Ok(Deleted {
    id,
    message: ack.message,
    page: next_page,
    remaining_on_page: remaining,
  })
}

/// Posts left on the page: the refetched count when the refetch succeeded,
/// otherwise the shown page minus the deleted post.
fn remaining_on_page(refreshed: &QuerySnapshot<BlogPage>, local: &BlogPage) -> usize {
  match refreshed.data() {
    Some(page) if refreshed.is_success() => page.blogs.len(),
    _ => {
      if let Some(err) = refreshed.error() {
        warn!(error = %err, "list refetch failed after delete");
      }
      local.blogs.len()
    }
  }
}

/// Overlay command-line fields on `base`, uploading any new images first.
async fn post_input(store: &QueryStore, post: PostArgs, base: BlogInput) -> Result<BlogInput> {
  let content = match post.content_file {
    Some(path) => Some(
      tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?,
    ),
    None => post.content,
  };

  let mut input = BlogInput {
    title: post.title.unwrap_or(base.title),
    content: content.unwrap_or(base.content),
    author: post.author.unwrap_or(base.author),
    category: post.category.or(base.category),
    tags: post.tags.as_deref().map(parse_tag_list).unwrap_or(base.tags),
    images: base.images,
    is_published: if post.draft { false } else { base.is_published },
    published_at: base.published_at,
  };

  input.images.extend(upload_images(store, &post.images).await?);
  Ok(input)
}

/// Upload all images concurrently. The first failure aborts the batch.
async fn upload_images(store: &QueryStore, paths: &[PathBuf]) -> Result<Vec<BlogImage>> {
  if paths.is_empty() {
    return Ok(Vec::new());
  }

  let files = try_join_all(paths.iter().map(|path| async move {
    ImageFile::read(path)
      .await
      .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
  }))
  .await?;

  for file in &files {
    file.validate()?;
  }

  let uploaded = try_join_all(files.into_iter().map(|file| store.mutate::<UploadImage>(file))).await?;
  info!(count = uploaded.len(), "uploaded images");
  Ok(uploaded)
}

async fn run_categories(cmd: CategoryCommand, store: &QueryStore, out: &Output) -> Result<()> {
  match cmd {
    CategoryCommand::List => {
      let categories = store.query::<GetCategories>(()).await?;
      out.emit(categories.as_ref(), |cs| {
        cs.iter().map(render_category_line).collect::<Vec<_>>().join("\n")
      })
    }
    CategoryCommand::Show { id } => {
      let category = store.query::<GetCategory>(id).await?;
      out.emit(category.as_ref(), render_category_detail)
    }
    CategoryCommand::Create {
      name,
      description,
      category_type,
      image,
    } => {
      let image = ImageFile::read(&image)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", image.display(), e))?;
      let created = store
        .mutate::<CreateCategory>(CategoryInput {
          name,
          description,
          category_type,
          image,
        })
        .await?;
      out.emit(&created, |s| render_saved(s, "Created", render_category_line))
    }
    CategoryCommand::Update {
      id,
      name,
      description,
      category_type,
    } => {
      let updated = store
        .mutate::<UpdateCategoryDetails>(UpdateCategory {
          id,
          changes: CategoryChanges {
            name,
            description,
            category_type,
          },
        })
        .await?;
      out.emit(&updated, |s| render_saved(s, "Updated", render_category_line))
    }
    CategoryCommand::Delete { id } => {
      let ack = store.mutate::<DeleteCategory>(id).await?;
      println!("{}", ack.message.as_deref().unwrap_or("Category deleted"));
      Ok(())
    }
  }
}

async fn run_places(cmd: PlaceCommand, store: &QueryStore, out: &Output) -> Result<()> {
  match cmd {
    PlaceCommand::Show { id } => {
      let place = store.query::<GetPlace>(id).await?;
      out.emit(place.as_ref(), render_place)
    }
    PlaceCommand::Add {
      category,
      title,
      description,
      location,
      image,
    } => {
      let image = ImageFile::read(&image)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", image.display(), e))?;
      let added = store
        .mutate::<AddPlace>(PlaceInput {
          category_id: category,
          title,
          description,
          location,
          image,
        })
        .await?;
      out.emit(&added, |s| render_saved(s, "Added", render_place))
    }
    PlaceCommand::Delete { id } => {
      let ack = store.mutate::<DeletePlace>(id).await?;
      println!("{}", ack.message.as_deref().unwrap_or("Place deleted"));
      Ok(())
    }
  }
}

// ============================================================================
// Text rendering
// ============================================================================

/// The saved record when the backend echoed one, otherwise its message.
fn render_saved<T>(saved: &Saved<T>, verb: &str, line: impl Fn(&T) -> String) -> String {
  match (&saved.data, &saved.message) {
    (Some(record), _) => format!("{} {}", verb, line(record)),
    (None, Some(message)) => message.clone(),
    (None, None) => verb.to_string(),
  }
}

fn render_blog_line(blog: &Blog) -> String {
  let mut line = format!("{}  {}", blog.id, blog.title);
  if !blog.author.is_empty() {
    line.push_str(&format!("  by {}", blog.author));
  }
  if !blog.is_published {
    line.push_str("  [draft]");
  }
  if !blog.tags.is_empty() {
    line.push_str(&format!("  #{}", blog.tags.join(" #")));
  }
  line
}

fn render_page(page: &BlogPage) -> String {
  let mut lines: Vec<String> = page.blogs.iter().map(render_blog_line).collect();
  if lines.is_empty() {
    lines.push("No posts found".to_string());
  }
  if let Some(p) = &page.pagination {
    lines.push(format!(
      "page {}/{} ({} posts)",
      p.current_page, p.total_pages, p.total_blogs
    ));
  }
  lines.join("\n")
}

fn render_blog_detail(blog: &Blog) -> String {
  let mut lines = vec![render_blog_line(blog)];
  if let Some(category) = &blog.category {
    lines.push(format!("category: {}", category.label()));
  }
  if let Some(at) = blog.published_at.or(blog.created_at) {
    lines.push(format!("date: {}", at.format("%Y-%m-%d %H:%M")));
  }
  for image in &blog.images {
    lines.push(format!("image: {}", image.url));
  }
  lines.push(String::new());
  lines.push(blog.content.clone());
  lines.join("\n")
}

fn render_category_line(category: &Category) -> String {
  format!(
    "{}  {}  ({}, {} places)",
    category.id,
    category.name,
    category.category_type.as_deref().unwrap_or("-"),
    category.places.len()
  )
}

fn render_category_detail(category: &Category) -> String {
  let mut lines = vec![render_category_line(category)];
  if !category.description.is_empty() {
    lines.push(category.description.clone());
  }
  for place in &category.places {
    match place {
      PlaceRef::Populated(p) => lines.push(format!("  {}", render_place(p))),
      PlaceRef::Id(id) => lines.push(format!("  {}", id)),
    }
  }
  lines.join("\n")
}

fn render_place(place: &Place) -> String {
  format!("{}  {}  ({})", place.id, place.title, place.location)
}
