//! Shared handler context built once from `ServiceConfig`.

use ecoleta_core::{
    open_db, AssetError, AssetUrlBuilder, BcryptHasher, ConfigError, CredentialError, DbError,
    DiskAssetStore, HmacTokenIssuer, RegistrationContext, ServiceConfig, TokenError,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Failure while building the handler context.
#[derive(Debug)]
pub enum ApiSetupError {
    Config(ConfigError),
    Asset(AssetError),
    Credential(CredentialError),
    Token(TokenError),
    Db(DbError),
}

impl Display for ApiSetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Asset(err) => write!(f, "upload directory unavailable: {err}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Token(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "database unavailable: {err}"),
        }
    }
}

impl Error for ApiSetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Asset(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Token(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ApiSetupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<AssetError> for ApiSetupError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

impl From<CredentialError> for ApiSetupError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<TokenError> for ApiSetupError {
    fn from(value: TokenError) -> Self {
        Self::Token(value)
    }
}

impl From<DbError> for ApiSetupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Collaborators shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    config: Arc<ServiceConfig>,
    assets: Arc<DiskAssetStore>,
    registration: RegistrationContext,
    item_urls: AssetUrlBuilder,
}

impl ApiContext {
    /// Validates `config`, prepares the upload directory and migrates the
    /// database so the first request does not pay for it.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ApiSetupError> {
        config.validate()?;
        let assets = Arc::new(DiskAssetStore::open(&config.upload_dir)?);
        let credentials = Arc::new(BcryptHasher::new(config.bcrypt_cost)?);
        let tokens = Arc::new(HmacTokenIssuer::new(
            config.token_secret.as_bytes(),
            config.token_ttl(),
        )?);
        drop(open_db(&config.database_path)?);

        let registration = RegistrationContext {
            credentials,
            tokens,
            assets: assets.clone(),
            urls: AssetUrlBuilder::new(config.asset_base_url.clone()),
        };
        let item_urls = AssetUrlBuilder::new(config.item_image_base_url());
        info!("event=api_context module=api status=ok");

        Ok(Self {
            config: Arc::new(config),
            assets,
            registration,
            item_urls,
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    pub fn assets(&self) -> &DiskAssetStore {
        &self.assets
    }

    pub(crate) fn registration(&self) -> RegistrationContext {
        self.registration.clone()
    }

    pub(crate) fn point_urls(&self) -> AssetUrlBuilder {
        self.registration.urls.clone()
    }

    pub(crate) fn item_urls(&self) -> AssetUrlBuilder {
        self.item_urls.clone()
    }
}
