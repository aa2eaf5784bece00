//! Places listed under a category.

use serde_json::Value;

use crate::cache::{MutationEndpoint, QueryEndpoint, Tag, TagKind};
use crate::transport::{ApiError, FormPart, Request};

use super::types::{Ack, Place, Saved};
use super::upload::{require, ImageFile};

/// A new place inside a category.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceInput {
  pub category_id: String,
  pub title: String,
  pub description: String,
  pub location: String,
  pub image: ImageFile,
}

/// `GET /places/place/{id}`
pub struct GetPlace;

impl QueryEndpoint for GetPlace {
  type Args = String;
  type Output = Place;
  const NAME: &'static str = "getPlace";

  fn request(id: &String) -> Request {
    Request::get(format!("/places/place/{}", id))
  }

  fn provides_tags(_place: &Place, id: &String) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Place, id)]
  }
}

/// `POST /places/{categoryId}/add-place` as a multipart form.
pub struct AddPlace;

impl MutationEndpoint for AddPlace {
  type Args = PlaceInput;
  type Output = Saved<Place>;
  const NAME: &'static str = "addPlace";

  fn validate(input: &PlaceInput) -> Result<(), ApiError> {
    require("Category", &input.category_id)?;
    require("Title", &input.title)?;
    require("Description", &input.description)?;
    require("Location", &input.location)?;
    Ok(input.image.validate()?)
  }

  fn request(input: &PlaceInput) -> Request {
    Request::post(format!("/places/{}/add-place", input.category_id)).multipart(vec![
      FormPart::text("title", input.title.trim()),
      FormPart::text("description", input.description.trim()),
      FormPart::text("location", input.location.trim()),
      input.image.to_part("image"),
    ])
  }

  fn transform(body: Value) -> Result<Saved<Place>, ApiError> {
    Saved::decode(body)
  }

  fn invalidates_tags(_result: Result<&Saved<Place>, &ApiError>, input: &PlaceInput) -> Vec<Tag> {
    vec![
      Tag::with_id(TagKind::Category, &input.category_id),
      Tag::of(TagKind::Category),
    ]
  }
}

/// `DELETE /places/place/{id}`
pub struct DeletePlace;

impl MutationEndpoint for DeletePlace {
  type Args = String;
  type Output = Ack;
  const NAME: &'static str = "deletePlace";

  fn validate(id: &String) -> Result<(), ApiError> {
    Ok(require("Id", id)?)
  }

  fn request(id: &String) -> Request {
    Request::delete(format!("/places/place/{}", id))
  }

  fn transform(body: Value) -> Result<Ack, ApiError> {
    Ack::decode(body)
  }

  fn invalidates_tags(_result: Result<&Ack, &ApiError>, id: &String) -> Vec<Tag> {
    vec![Tag::with_id(TagKind::Place, id), Tag::of(TagKind::Category)]
  }
}
