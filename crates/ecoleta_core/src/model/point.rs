//! Collection point model.
//!
//! # Responsibility
//! - Define the sanitized point record returned to callers.
//! - Define registration (`NewPoint`) and update (`PointPatch`) payloads.
//! - Normalize and validate payload fields before persistence.
//!
//! # Invariants
//! - `Point` has no credential field; the hash lives only in repository rows.
//! - `email` is unique across all points, compared after normalization.
//! - `uf` is always two uppercase ASCII letters.
//! - Latitude/longitude are finite and inside WGS84 bounds.

use crate::model::item::ItemId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// System-assigned point identifier.
pub type PointId = i64;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static UF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid uf regex"));

const REDACTED: &str = "<redacted>";

/// Sanitized point record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: PointId,
    pub name: String,
    /// Contact identity, unique across points.
    pub email: String,
    pub whatsapp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    /// Two-letter administrative region code.
    pub uf: String,
    /// Stored image filename. `None` until the first successful write.
    pub image: Option<String>,
}

/// Point with its stored image rewritten into an externally resolvable URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecoratedPoint {
    #[serde(flatten)]
    pub point: Point,
    pub image_url: Option<String>,
}

/// Lookup key used when reporting a missing point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointKey {
    Id(PointId),
    Email(String),
}

impl Display for PointKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            // Contact identities are personal data; keep them out of messages.
            Self::Email(_) => write!(f, "email=<redacted>"),
        }
    }
}

/// Registration payload for a new point.
#[derive(Clone, PartialEq)]
pub struct NewPoint {
    pub name: String,
    pub email: String,
    /// Raw credential. Hashed before persistence, never stored or logged.
    pub password: String,
    pub whatsapp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub uf: String,
    pub items: BTreeSet<ItemId>,
    /// Filename of an already stored image asset.
    pub image: Option<String>,
}

impl NewPoint {
    /// Validates every field and returns the normalized payload.
    ///
    /// The image reference is not checked here; its presence in the asset
    /// store is a registration precondition handled by the service.
    pub fn normalize(self) -> Result<Self, PointValidationError> {
        if self.password.is_empty() {
            return Err(PointValidationError::BlankField("password"));
        }
        if self.items.is_empty() {
            return Err(PointValidationError::NoItems);
        }
        validate_coordinates(self.latitude, self.longitude)?;

        Ok(Self {
            name: normalize_text("name", &self.name)?,
            email: normalize_email(&self.email)?,
            whatsapp: normalize_text("whatsapp", &self.whatsapp)?,
            city: normalize_text("city", &self.city)?,
            uf: normalize_uf(&self.uf)?,
            image: self
                .image
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            ..self
        })
    }
}

impl Debug for NewPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPoint")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("whatsapp", &self.whatsapp)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("city", &self.city)
            .field("uf", &self.uf)
            .field("items", &self.items)
            .field("image", &self.image)
            .finish()
    }
}

/// Partial update payload. `None` fields keep their stored value.
#[derive(Clone, Default, PartialEq)]
pub struct PointPatch {
    pub name: Option<String>,
    /// New contact identity. Uniqueness is re-checked when it changes.
    pub email: Option<String>,
    /// New raw credential. When absent the stored hash is kept untouched.
    pub password: Option<String>,
    pub whatsapp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub uf: Option<String>,
    /// Full replacement association set. `None` leaves associations as-is.
    pub items: Option<BTreeSet<ItemId>>,
    /// Filename of a newly stored image asset replacing the current one.
    pub image: Option<String>,
}

impl PointPatch {
    /// Validates supplied fields and returns the normalized patch.
    ///
    /// Blank text fields count as "not supplied". A supplied but empty item
    /// set is rejected: a point always accepts at least one item.
    pub fn normalize(self) -> Result<Self, PointValidationError> {
        if let Some(latitude) = self.latitude {
            validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            validate_longitude(longitude)?;
        }
        if matches!(&self.items, Some(items) if items.is_empty()) {
            return Err(PointValidationError::NoItems);
        }

        Ok(Self {
            name: non_blank(self.name),
            email: non_blank(self.email)
                .map(|value| normalize_email(&value))
                .transpose()?,
            password: self.password.filter(|value| !value.is_empty()),
            whatsapp: non_blank(self.whatsapp),
            city: non_blank(self.city),
            uf: non_blank(self.uf)
                .map(|value| normalize_uf(&value))
                .transpose()?,
            image: non_blank(self.image),
            ..self
        })
    }
}

impl Debug for PointPatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointPatch")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("whatsapp", &self.whatsapp)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("city", &self.city)
            .field("uf", &self.uf)
            .field("items", &self.items)
            .field("image", &self.image)
            .finish()
    }
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PointValidationError {
    /// Required field missing or blank after trim.
    BlankField(&'static str),
    /// Contact identity is not an e-mail address.
    InvalidEmail,
    /// Region code is not two ASCII letters.
    InvalidRegionCode(String),
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    /// Registration or replacement item set is empty.
    NoItems,
    /// Item ids that do not exist in the catalog.
    UnknownItems(Vec<ItemId>),
    /// Delimited item-id text could not be parsed.
    InvalidItemId(String),
    /// List filter requires item ids unless all items are included.
    MissingItemFilter,
}

impl PointValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::BlankField(field) => field,
            Self::InvalidEmail => "email",
            Self::InvalidRegionCode(_) => "uf",
            Self::LatitudeOutOfRange(_) => "latitude",
            Self::LongitudeOutOfRange(_) => "longitude",
            Self::NoItems
            | Self::UnknownItems(_)
            | Self::InvalidItemId(_)
            | Self::MissingItemFilter => "items",
        }
    }
}

impl Display for PointValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvalidEmail => write!(f, "`email` must be a valid e-mail address"),
            Self::InvalidRegionCode(value) => {
                write!(f, "`uf` must be two letters, got `{value}`")
            }
            Self::LatitudeOutOfRange(value) => {
                write!(f, "`latitude` must be within [-90, 90], got {value}")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "`longitude` must be within [-180, 180], got {value}")
            }
            Self::NoItems => write!(f, "at least one item must be selected"),
            Self::UnknownItems(ids) => write!(f, "unknown item ids: {ids:?}"),
            Self::InvalidItemId(segment) => {
                write!(f, "invalid item id `{segment}`; expected a positive integer")
            }
            Self::MissingItemFilter => {
                write!(f, "`items` is required unless all items are included")
            }
        }
    }
}

impl Error for PointValidationError {}

/// Trims and lowercases a contact identity, rejecting non e-mail values.
pub fn normalize_email(value: &str) -> Result<String, PointValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PointValidationError::BlankField("email"));
    }
    let lowered = trimmed.to_lowercase();
    if !EMAIL_RE.is_match(&lowered) {
        return Err(PointValidationError::InvalidEmail);
    }
    Ok(lowered)
}

/// Trims and uppercases a region code, rejecting anything but two letters.
pub fn normalize_uf(value: &str) -> Result<String, PointValidationError> {
    let normalized = value.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(PointValidationError::BlankField("uf"));
    }
    if !UF_RE.is_match(&normalized) {
        return Err(PointValidationError::InvalidRegionCode(normalized));
    }
    Ok(normalized)
}

fn normalize_text(field: &'static str, value: &str) -> Result<String, PointValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PointValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), PointValidationError> {
    validate_latitude(latitude)?;
    validate_longitude(longitude)
}

fn validate_latitude(value: f64) -> Result<(), PointValidationError> {
    if value.is_finite() && (-90.0..=90.0).contains(&value) {
        Ok(())
    } else {
        Err(PointValidationError::LatitudeOutOfRange(value))
    }
}

fn validate_longitude(value: f64) -> Result<(), PointValidationError> {
    if value.is_finite() && (-180.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(PointValidationError::LongitudeOutOfRange(value))
    }
}
