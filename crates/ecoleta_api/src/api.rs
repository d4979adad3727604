//! Request handlers for the points directory.
//!
//! # Contract
//! - Sync calls; each opens its own database connection.
//! - Never panic; always return an `ApiResponse`.
//! - A file stored by a create/update that then fails is discarded before
//!   the handler returns.

use crate::context::ApiContext;
use crate::request::{PointForm, PointUpdateForm, PointsQuery, SessionForm, UploadedFile};
use crate::response::ApiResponse;
use ecoleta_core::{
    open_db, parse_item_ids, AssetStore, CatalogItem, ItemCatalogService, ItemId, NewPoint,
    PointFilter, PointId, PointPatch, PointQueryService, PointRegistrationService,
    PointServiceError, RepoError, RepoResult, SqliteItemRepository, SqlitePointRepository,
};
use log::info;
use std::collections::BTreeSet;
use std::time::Instant;

const SHOW_NOT_FOUND_MESSAGE: &str = "point not found.";
const UPDATE_NOT_FOUND_MESSAGE: &str = "raw point not found.";

/// `GET /points`: lists points in one city/region filtered by items.
pub fn index_points(ctx: &ApiContext, query: &PointsQuery) -> ApiResponse {
    let started_at = Instant::now();
    finish("index_points", started_at, index_points_inner(ctx, query))
}

/// `GET /points/:id`.
pub fn show_point(ctx: &ApiContext, id: &str) -> ApiResponse {
    let started_at = Instant::now();
    finish("show_point", started_at, show_point_inner(ctx, id))
}

/// `POST /points`: registers a point with its uploaded image.
pub fn create_point(
    ctx: &ApiContext,
    form: &PointForm,
    image: Option<UploadedFile>,
) -> ApiResponse {
    let started_at = Instant::now();
    let response = with_upload(ctx, image, |stored_image| {
        let candidate = new_point_from_form(form, stored_image.map(str::to_string))?;
        let receipt = with_point_repo(ctx, |repo| {
            PointRegistrationService::new(repo, ctx.registration()).create(candidate)
        })
        .map_err(|err| ApiResponse::from_service_error(&err, SHOW_NOT_FOUND_MESSAGE))?;
        Ok(ApiResponse::ok(receipt))
    });
    finish("create_point", started_at, response)
}

/// `PUT /points`: updates the point registered under `originalemail`.
pub fn update_point(
    ctx: &ApiContext,
    form: &PointUpdateForm,
    image: Option<UploadedFile>,
) -> ApiResponse {
    let started_at = Instant::now();
    let response = with_upload(ctx, image, |stored_image| {
        let patch = patch_from_form(&form.fields, stored_image.map(str::to_string))?;
        let original_email = form.originalemail.as_deref().unwrap_or_default();
        let details = with_point_repo(ctx, |repo| {
            PointRegistrationService::new(repo, ctx.registration()).update(original_email, patch)
        })
        .map_err(|err| ApiResponse::from_service_error(&err, UPDATE_NOT_FOUND_MESSAGE))?;
        Ok(ApiResponse::ok(details))
    });
    finish("update_point", started_at, response)
}

/// `POST /sessions`: checks a credential and issues a fresh token.
pub fn create_session(ctx: &ApiContext, form: &SessionForm) -> ApiResponse {
    let started_at = Instant::now();
    let response = with_point_repo(ctx, |repo| {
        PointRegistrationService::new(repo, ctx.registration()).authenticate(
            form.email.as_deref().unwrap_or_default(),
            form.password.as_deref().unwrap_or_default(),
        )
    })
    .map(ApiResponse::ok)
    .map_err(|err| ApiResponse::from_service_error(&err, SHOW_NOT_FOUND_MESSAGE));
    finish("create_session", started_at, response)
}

/// `GET /items`: the item catalog.
pub fn list_items(ctx: &ApiContext) -> ApiResponse {
    let started_at = Instant::now();
    let response = load_catalog(ctx).map(ApiResponse::ok).map_err(|err| {
        ApiResponse::from_service_error(&PointServiceError::from(err), SHOW_NOT_FOUND_MESSAGE)
    });
    finish("list_items", started_at, response)
}

fn index_points_inner(
    ctx: &ApiContext,
    query: &PointsQuery,
) -> Result<ApiResponse, ApiResponse> {
    let include_all_items = is_truthy(query.ignore_items.as_deref());
    let items = if include_all_items {
        BTreeSet::new()
    } else {
        parse_items(query.items.as_deref().unwrap_or_default())?
    };
    let filter = PointFilter {
        city: query.city.clone().unwrap_or_default(),
        uf: query.uf.clone().unwrap_or_default(),
        items,
        include_all_items,
        expand_items: is_truthy(query.return_items.as_deref()),
    };

    let points = with_point_repo(ctx, |repo| {
        PointQueryService::new(repo, ctx.point_urls()).list(&filter)
    })
    .map_err(|err| ApiResponse::from_service_error(&err, SHOW_NOT_FOUND_MESSAGE))?;
    Ok(ApiResponse::ok(points))
}

fn show_point_inner(ctx: &ApiContext, raw_id: &str) -> Result<ApiResponse, ApiResponse> {
    let id = raw_id
        .trim()
        .parse::<PointId>()
        .map_err(|_| ApiResponse::invalid_field("id", format!("invalid point id `{raw_id}`")))?;
    let details = with_point_repo(ctx, |repo| {
        PointQueryService::new(repo, ctx.point_urls()).show(id)
    })
    .map_err(|err| ApiResponse::from_service_error(&err, SHOW_NOT_FOUND_MESSAGE))?;
    Ok(ApiResponse::ok(details))
}

fn load_catalog(ctx: &ApiContext) -> RepoResult<Vec<CatalogItem>> {
    let conn = open_db(ctx.database_path())?;
    let repo = SqliteItemRepository::try_new(&conn)?;
    ItemCatalogService::new(repo, ctx.item_urls()).list_items()
}

fn with_point_repo<T>(
    ctx: &ApiContext,
    f: impl FnOnce(SqlitePointRepository<'_>) -> Result<T, PointServiceError>,
) -> Result<T, PointServiceError> {
    let mut conn = open_db(ctx.database_path()).map_err(RepoError::from)?;
    let repo = SqlitePointRepository::try_new(&mut conn)?;
    f(repo)
}

/// Stores the optional upload, runs `f` with its filename and discards the
/// file again when `f` fails.
fn with_upload(
    ctx: &ApiContext,
    image: Option<UploadedFile>,
    f: impl FnOnce(Option<&str>) -> Result<ApiResponse, ApiResponse>,
) -> Result<ApiResponse, ApiResponse> {
    let stored = match image {
        Some(file) => Some(
            ctx.assets()
                .store(&file.original_name, &file.bytes)
                .map_err(|err| ApiResponse::invalid_field("image", err.to_string()))?,
        ),
        None => None,
    };

    let result = f(stored.as_deref());
    if let (Err(_), Some(filename)) = (&result, stored.as_deref()) {
        ctx.assets().discard(filename);
    }
    result
}

fn new_point_from_form(form: &PointForm, image: Option<String>) -> Result<NewPoint, ApiResponse> {
    Ok(NewPoint {
        name: form.name.clone().unwrap_or_default(),
        email: form.email.clone().unwrap_or_default(),
        password: form.password.clone().unwrap_or_default(),
        whatsapp: form.whatsapp.clone().unwrap_or_default(),
        latitude: parse_required_coordinate("latitude", form.latitude.as_deref())?,
        longitude: parse_required_coordinate("longitude", form.longitude.as_deref())?,
        city: form.city.clone().unwrap_or_default(),
        uf: form.uf.clone().unwrap_or_default(),
        items: parse_items(form.items.as_deref().unwrap_or_default())?,
        image,
    })
}

fn patch_from_form(form: &PointForm, image: Option<String>) -> Result<PointPatch, ApiResponse> {
    let items = match form.items.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(parse_items(text)?),
    };
    Ok(PointPatch {
        name: form.name.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
        whatsapp: form.whatsapp.clone(),
        latitude: parse_optional_coordinate("latitude", form.latitude.as_deref())?,
        longitude: parse_optional_coordinate("longitude", form.longitude.as_deref())?,
        city: form.city.clone(),
        uf: form.uf.clone(),
        items,
        image,
    })
}

fn parse_items(text: &str) -> Result<BTreeSet<ItemId>, ApiResponse> {
    parse_item_ids(text).map_err(|err| ApiResponse::invalid_field("items", err.to_string()))
}

fn parse_required_coordinate(field: &'static str, raw: Option<&str>) -> Result<f64, ApiResponse> {
    parse_optional_coordinate(field, raw)?
        .ok_or_else(|| ApiResponse::invalid_field(field, format!("`{field}` must not be blank")))
}

fn parse_optional_coordinate(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<f64>, ApiResponse> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
            ApiResponse::invalid_field(field, format!("`{field}` must be a number, got `{text}`"))
        }),
    }
}

/// `true`, `1`, `yes` and `on` (any case) are truthy.
fn is_truthy(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

fn finish(
    route: &'static str,
    started_at: Instant,
    response: Result<ApiResponse, ApiResponse>,
) -> ApiResponse {
    let response = response.unwrap_or_else(|failure| failure);
    info!(
        "event=api_request module=api route={route} http_status={} duration_ms={}",
        response.status,
        started_at.elapsed().as_millis()
    );
    response
}
