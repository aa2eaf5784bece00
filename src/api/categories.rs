//! Travel categories.

use serde_json::Value;

use crate::cache::{MutationEndpoint, QueryEndpoint, Tag, TagKind};
use crate::transport::{ApiError, FormPart, Request};

use super::types::{Ack, Category, PlaceRef, Saved, UpdateCategory};
use super::upload::{require, ImageFile};

const CATEGORY: Tag = Tag::of(TagKind::Category);

/// Fields for a new category. The image is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
  pub name: String,
  pub description: String,
  pub category_type: String,
  pub image: ImageFile,
}

/// `GET /categories/getAllCategories`
pub struct GetCategories;

impl QueryEndpoint for GetCategories {
  type Args = ();
  type Output = Vec<Category>;
  const NAME: &'static str = "getCategories";

  fn request(_args: &()) -> Request {
    Request::get("/categories/getAllCategories")
  }

  fn provides_tags(categories: &Vec<Category>, _args: &()) -> Vec<Tag> {
    std::iter::once(CATEGORY)
      .chain(categories.iter().map(|c| Tag::with_id(TagKind::Category, &c.id)))
      .collect()
  }
}

/// `GET /categories/{id}`, including its places.
pub struct GetCategory;

impl QueryEndpoint for GetCategory {
  type Args = String;
  type Output = Category;
  const NAME: &'static str = "getCategory";

  fn request(id: &String) -> Request {
    Request::get(format!("/categories/{}", id))
  }

  fn provides_tags(category: &Category, id: &String) -> Vec<Tag> {
    std::iter::once(Tag::with_id(TagKind::Category, id))
      .chain(
        category
          .places
          .iter()
          .map(|p| Tag::with_id(TagKind::Place, PlaceRef::id(p))),
      )
      .collect()
  }
}

/// `POST /categories/createCategory/create` as a multipart form.
pub struct CreateCategory;

impl MutationEndpoint for CreateCategory {
  type Args = CategoryInput;
  type Output = Saved<Category>;
  const NAME: &'static str = "createCategory";

  fn validate(input: &CategoryInput) -> Result<(), ApiError> {
    require("Name", &input.name)?;
    require("Description", &input.description)?;
    require("Category type", &input.category_type)?;
    Ok(input.image.validate()?)
  }

  fn request(input: &CategoryInput) -> Request {
    Request::post("/categories/createCategory/create").multipart(vec![
      FormPart::text("name", input.name.trim()),
      FormPart::text("description", input.description.trim()),
      FormPart::text("categoryType", input.category_type.trim()),
      input.image.to_part("image"),
    ])
  }

  fn transform(body: Value) -> Result<Saved<Category>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Category>, &ApiError>, _input: &CategoryInput) -> Vec<Tag> {
    vec![CATEGORY]
  }
}

/// `PUT /categories/{id}`
pub struct UpdateCategoryDetails;

impl MutationEndpoint for UpdateCategoryDetails {
  type Args = UpdateCategory;
  type Output = Saved<Category>;
  const NAME: &'static str = "updateCategory";

  fn validate(args: &UpdateCategory) -> Result<(), ApiError> {
    Ok(require("Id", &args.id)?)
  }

  fn request(args: &UpdateCategory) -> Request {
    Request::put(format!("/categories/{}", args.id)).json(args.changes.to_body())
  }

  fn transform(body: Value) -> Result<Saved<Category>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Category>, &ApiError>, args: &UpdateCategory) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Category, &args.id), CATEGORY]
  }
}

/// `DELETE /categories/{id}`
pub struct DeleteCategory;

impl MutationEndpoint for DeleteCategory {
  type Args = String;
  type Output = Ack;
  const NAME: &'static str = "deleteCategory";

  fn validate(id: &String) -> Result<(), ApiError> {
    Ok(require("Id", id)?)
  }

  fn request(id: &String) -> Request {
    Request::delete(format!("/categories/{}", id))
  }

  fn transform(body: Value) -> Result<Ack, ApiError> {
    Ack::decode(body)
  }

  fn invalidates_tags(_result: Result<&Ack, &ApiError>, _id: &String) -> Vec<Tag> {
    vec![CATEGORY]
  }
}
