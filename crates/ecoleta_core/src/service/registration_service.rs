//! Point registration use cases: create, update and credential check.
//!
//! # Responsibility
//! - Validate payloads, check identity uniqueness and hash credentials
//!   before any unit of work opens.
//! - Drive one repository unit of work per write, with token issuance
//!   (create) or replaced-image retirement (update) as its final step.
//!
//! # Invariants
//! - Raw credentials are hashed once and then dropped; neither the raw value
//!   nor the hash leaves this module.
//! - An update without a credential keeps the stored hash.
//! - A replaced image is retired inside the update unit of work and purged
//!   only after commit. If the update rolls back the image is restored, so
//!   the old reference stays valid.

use crate::asset::{AssetStore, AssetUrlBuilder, RetiredAsset};
use crate::auth::credential::CredentialHasher;
use crate::auth::token::AccessTokenIssuer;
use crate::model::point::{normalize_email, DecoratedPoint, NewPoint, PointKey, PointPatch};
use crate::repo::point_repo::{PointChanges, PointDraft, PointRepository};
use crate::service::error::PointServiceError;
use crate::service::{decorate, PointDetails};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Collaborators shared by registration requests.
#[derive(Clone)]
pub struct RegistrationContext {
    pub credentials: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn AccessTokenIssuer>,
    pub assets: Arc<dyn AssetStore>,
    pub urls: AssetUrlBuilder,
}

/// Successful registration or sign-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationReceipt {
    pub point: DecoratedPoint,
    /// Access token bound to the point id.
    pub token: String,
}

/// Registration service over a point repository.
pub struct PointRegistrationService<R: PointRepository> {
    repo: R,
    ctx: RegistrationContext,
}

impl<R: PointRepository> PointRegistrationService<R> {
    pub fn new(repo: R, ctx: RegistrationContext) -> Self {
        Self { repo, ctx }
    }

    /// Registers a new point and issues its access token.
    ///
    /// # Errors
    /// - `Validation` for malformed fields or unknown item ids.
    /// - `MissingImageReference` when no stored image is referenced.
    /// - `DuplicateIdentity` when the e-mail is taken, including when a
    ///   concurrent registration wins the race.
    /// - Infrastructure errors after a full rollback.
    pub fn create(
        &mut self,
        candidate: NewPoint,
    ) -> Result<RegistrationReceipt, PointServiceError> {
        let started_at = Instant::now();
        let result = self.create_inner(candidate);
        match &result {
            Ok(receipt) => info!(
                "event=point_create module=registration status=ok point_id={} duration_ms={}",
                receipt.point.point.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=point_create module=registration status=error error_code={} duration_ms={}",
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn create_inner(
        &mut self,
        candidate: NewPoint,
    ) -> Result<RegistrationReceipt, PointServiceError> {
        let candidate = candidate.normalize()?;
        let image = candidate
            .image
            .clone()
            .filter(|image| self.ctx.assets.contains(image))
            .ok_or(PointServiceError::MissingImageReference)?;

        if self.repo.find_by_email(&candidate.email)?.is_some() {
            return Err(PointServiceError::DuplicateIdentity);
        }

        let password_hash = self.ctx.credentials.hash_credential(&candidate.password)?;
        let draft = PointDraft {
            name: candidate.name,
            email: candidate.email,
            password_hash,
            whatsapp: candidate.whatsapp,
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            city: candidate.city,
            uf: candidate.uf,
            image,
        };

        let tokens = &self.ctx.tokens;
        // The token is signed inside the unit of work so a signing failure
        // leaves no point behind.
        let (point, token) = self.repo.create_point(&draft, &candidate.items, |point| {
            tokens.issue(point.id).map_err(PointServiceError::from)
        })?;

        Ok(RegistrationReceipt {
            point: decorate(point, &self.ctx.urls),
            token,
        })
    }

    /// Updates the point registered under `original_email`.
    ///
    /// Only supplied fields change. A supplied item set replaces the current
    /// associations exactly; an absent one leaves them untouched.
    ///
    /// # Errors
    /// - `PointNotFound` when no point has `original_email`; nothing changes.
    /// - `DuplicateIdentity` when the new e-mail belongs to another point.
    /// - `MissingImageReference` when the new image is not stored.
    /// - `AssetReleaseFailure` when the replaced image cannot be retired.
    pub fn update(
        &mut self,
        original_email: &str,
        patch: PointPatch,
    ) -> Result<PointDetails, PointServiceError> {
        let started_at = Instant::now();
        let result = self.update_inner(original_email, patch);
        match &result {
            Ok(details) => info!(
                "event=point_update module=registration status=ok point_id={} items={} duration_ms={}",
                details.point.point.id,
                details.items.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=point_update module=registration status=error error_code={} duration_ms={}",
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn update_inner(
        &mut self,
        original_email: &str,
        patch: PointPatch,
    ) -> Result<PointDetails, PointServiceError> {
        let original_email = original_email.trim().to_lowercase();
        if original_email.is_empty() {
            return Err(PointServiceError::PointNotFound(PointKey::Email(
                original_email,
            )));
        }
        let patch = patch.normalize()?;

        if let Some(image) = patch.image.as_deref() {
            if !self.ctx.assets.contains(image) {
                return Err(PointServiceError::MissingImageReference);
            }
        }
        if let Some(email) = patch.email.as_deref() {
            if email != original_email && self.repo.find_by_email(email)?.is_some() {
                return Err(PointServiceError::DuplicateIdentity);
            }
        }

        let password_hash = patch
            .password
            .as_deref()
            .map(|raw| self.ctx.credentials.hash_credential(raw))
            .transpose()?;
        let changes = PointChanges {
            name: patch.name,
            email: patch.email,
            password_hash,
            whatsapp: patch.whatsapp,
            latitude: patch.latitude,
            longitude: patch.longitude,
            city: patch.city,
            uf: patch.uf,
            image: patch.image,
        };

        let assets = &self.ctx.assets;
        let mut retired: Option<RetiredAsset> = None;
        let outcome = self.repo.update_point(
            &original_email,
            &changes,
            patch.items.as_ref(),
            |previous, updated| match (previous.image.as_deref(), updated.image.as_deref()) {
                (Some(old), Some(new)) if old != new => assets
                    .retire(old)
                    .map(|asset| retired = Some(asset))
                    .map_err(PointServiceError::AssetReleaseFailure),
                _ => Ok(()),
            },
        );

        let (point, items) = match outcome {
            Ok(updated) => {
                if let Some(retired) = retired.as_ref() {
                    if let Err(err) = assets.purge(retired) {
                        warn!(
                            "event=asset_purge module=registration status=error error={err}"
                        );
                    }
                }
                updated
            }
            Err(err) => {
                if let Some(retired) = retired.as_ref() {
                    if let Err(restore_err) = assets.restore(retired) {
                        warn!(
                            "event=asset_restore module=registration status=error error={restore_err}"
                        );
                    }
                }
                return Err(err);
            }
        };

        Ok(PointDetails {
            point: decorate(point, &self.ctx.urls),
            items,
        })
    }

    /// Checks a credential against the stored hash and issues a new token.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegistrationReceipt, PointServiceError> {
        let email = normalize_email(email).map_err(|_| PointServiceError::InvalidCredentials)?;
        let stored = self
            .repo
            .find_by_email(&email)?
            .ok_or(PointServiceError::InvalidCredentials)?;

        if !self
            .ctx
            .credentials
            .verify_credential(password, &stored.password_hash)?
        {
            warn!("event=point_authenticate module=registration status=rejected");
            return Err(PointServiceError::InvalidCredentials);
        }

        let token = self.ctx.tokens.issue(stored.point.id)?;
        info!(
            "event=point_authenticate module=registration status=ok point_id={}",
            stored.point.id
        );
        Ok(RegistrationReceipt {
            point: decorate(stored.point, &self.ctx.urls),
            token,
        })
    }
}
