//! Core domain logic for the Ecoleta collection points directory.
//! This crate is the single source of truth for business invariants.

pub mod asset;
pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use asset::{AssetError, AssetStore, AssetUrlBuilder, DiskAssetStore, RetiredAsset};
pub use auth::credential::{
    BcryptHasher, CredentialError, CredentialHasher, DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST,
    MIN_BCRYPT_COST,
};
pub use auth::token::{AccessClaims, AccessTokenIssuer, HmacTokenIssuer, TokenError};
pub use config::{ConfigError, ServiceConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{parse_item_ids, CatalogItem, Item, ItemId, ItemIdParseError};
pub use model::point::{
    DecoratedPoint, NewPoint, Point, PointId, PointKey, PointPatch, PointValidationError,
};
pub use repo::item_repo::{ItemRepository, SqliteItemRepository};
pub use repo::point_repo::{
    PointListQuery, PointRepository, RepoError, RepoResult, SqlitePointRepository,
};
pub use service::error::{ErrorKind, PointServiceError};
pub use service::item_service::ItemCatalogService;
pub use service::query_service::{PointFilter, PointQueryService, PointSummary};
pub use service::registration_service::{
    PointRegistrationService, RegistrationContext, RegistrationReceipt,
};
pub use service::PointDetails;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
