//! Service error taxonomy shared by registration and query use cases.

use crate::asset::AssetError;
use crate::auth::credential::CredentialError;
use crate::auth::token::TokenError;
use crate::model::point::{PointKey, PointValidationError};
use crate::repo::point_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input; nothing was written.
    Validation,
    /// Business-rule conflict; nothing was written.
    Conflict,
    NotFound,
    Unauthorized,
    /// Storage, hashing or signing failure; the unit of work was rolled back.
    Infrastructure,
}

/// Error returned by point services.
#[derive(Debug)]
pub enum PointServiceError {
    Validation(PointValidationError),
    /// Contact identity already registered by another point.
    DuplicateIdentity,
    /// No stored image asset was referenced.
    MissingImageReference,
    PointNotFound(PointKey),
    /// Unknown identity or wrong credential; deliberately indistinguishable.
    InvalidCredentials,
    AssetReleaseFailure(AssetError),
    Credential(CredentialError),
    Token(TokenError),
    Persistence(RepoError),
}

impl PointServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::MissingImageReference => ErrorKind::Validation,
            Self::DuplicateIdentity => ErrorKind::Conflict,
            Self::PointNotFound(_) => ErrorKind::NotFound,
            Self::InvalidCredentials => ErrorKind::Unauthorized,
            Self::AssetReleaseFailure(_)
            | Self::Credential(_)
            | Self::Token(_)
            | Self::Persistence(_) => ErrorKind::Infrastructure,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_FIELD",
            Self::DuplicateIdentity => "EMAIL_ALREADY_REGISTERED",
            Self::MissingImageReference => "IMAGE_REQUIRED",
            Self::PointNotFound(_) => "POINT_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AssetReleaseFailure(_) => "ASSET_RELEASE_FAILED",
            Self::Credential(_) => "CREDENTIAL_FAILURE",
            Self::Token(_) => "TOKEN_FAILURE",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Input field the error refers to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err) => Some(err.field()),
            Self::DuplicateIdentity => Some("email"),
            Self::MissingImageReference => Some("image"),
            _ => None,
        }
    }
}

impl Display for PointServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateIdentity => write!(f, "this email is already registered"),
            Self::MissingImageReference => write!(f, "an uploaded image is required"),
            Self::PointNotFound(key) => write!(f, "point not found: {key}"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::AssetReleaseFailure(err) => write!(f, "failed to release replaced image: {err}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Token(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PointServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::AssetReleaseFailure(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Token(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PointServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PointNotFound(key) => Self::PointNotFound(key),
            RepoError::DuplicateEmail => Self::DuplicateIdentity,
            RepoError::UnknownItems(ids) => {
                Self::Validation(PointValidationError::UnknownItems(ids))
            }
            other => Self::Persistence(other),
        }
    }
}

impl From<PointValidationError> for PointServiceError {
    fn from(value: PointValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CredentialError> for PointServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<TokenError> for PointServiceError {
    fn from(value: TokenError) -> Self {
        Self::Token(value)
    }
}
