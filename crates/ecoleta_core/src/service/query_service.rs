//! Point lookup use cases: filtered listing and single-point retrieval.
//!
//! Read-only; runs without a unit of work and may run with any concurrency.

use crate::asset::AssetUrlBuilder;
use crate::model::item::{Item, ItemId};
use crate::model::point::{normalize_uf, DecoratedPoint, PointId, PointKey, PointValidationError};
use crate::repo::point_repo::{PointListQuery, PointRepository};
use crate::service::error::PointServiceError;
use crate::service::{decorate, PointDetails};
use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;

/// Listing filter as parsed at the request boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointFilter {
    pub city: String,
    pub uf: String,
    /// Items of interest; required unless `include_all_items` is set.
    pub items: BTreeSet<ItemId>,
    /// Skip the item filter entirely.
    pub include_all_items: bool,
    /// Nest each point's accepted items in the result.
    pub expand_items: bool,
}

/// One listing row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSummary {
    #[serde(flatten)]
    pub point: DecoratedPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
}

pub struct PointQueryService<R: PointRepository> {
    repo: R,
    urls: AssetUrlBuilder,
}

impl<R: PointRepository> PointQueryService<R> {
    pub fn new(repo: R, urls: AssetUrlBuilder) -> Self {
        Self { repo, urls }
    }

    /// Lists points in one city/region, optionally filtered by accepted
    /// items. Each point appears once; result order is unspecified.
    pub fn list(&self, filter: &PointFilter) -> Result<Vec<PointSummary>, PointServiceError> {
        let city = filter.city.trim();
        if city.is_empty() {
            return Err(PointValidationError::BlankField("city").into());
        }
        let uf = normalize_uf(&filter.uf)?;
        let items = if filter.include_all_items {
            None
        } else if filter.items.is_empty() {
            return Err(PointValidationError::MissingItemFilter.into());
        } else {
            Some(filter.items.clone())
        };

        let points = self.repo.list_points(&PointListQuery {
            city: city.to_string(),
            uf,
            items,
        })?;
        debug!(
            "event=point_list module=query status=ok count={} expand_items={}",
            points.len(),
            filter.expand_items
        );

        points
            .into_iter()
            .map(|point| -> Result<PointSummary, PointServiceError> {
                let items = if filter.expand_items {
                    Some(self.repo.items_for_point(point.id)?)
                } else {
                    None
                };
                Ok(PointSummary {
                    point: decorate(point, &self.urls),
                    items,
                })
            })
            .collect()
    }

    /// Gets one point with its accepted items.
    pub fn show(&self, id: PointId) -> Result<PointDetails, PointServiceError> {
        let point = self
            .repo
            .get_point(id)?
            .ok_or(PointServiceError::PointNotFound(PointKey::Id(id)))?;
        let items = self.repo.items_for_point(id)?;
        Ok(PointDetails {
            point: decorate(point, &self.urls),
            items,
        })
    }
}
