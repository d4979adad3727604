//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, hashing, asset handling and repository units of
//!   work into the points directory use cases.
//! - Decorate outgoing records (image URLs) and keep credential material out
//!   of every output type.
//!
//! # Invariants
//! - Every error detected before a unit of work opens prevents it from
//!   opening; every error inside one rolls it back.
//! - No operation is retried.

pub mod error;
pub mod item_service;
pub mod query_service;
pub mod registration_service;

use crate::asset::AssetUrlBuilder;
use crate::model::item::Item;
use crate::model::point::{DecoratedPoint, Point};
use serde::Serialize;

/// A point together with the items it currently accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointDetails {
    pub point: DecoratedPoint,
    pub items: Vec<Item>,
}

pub(crate) fn decorate(point: Point, urls: &AssetUrlBuilder) -> DecoratedPoint {
    let image_url = point.image.as_deref().map(|image| urls.url_for(image));
    DecoratedPoint { point, image_url }
}
