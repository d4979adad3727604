//! Service configuration.
//!
//! # Responsibility
//! - Describe every externally supplied setting the points core needs.
//! - Validate settings once at startup; services receive plain values.
//!
//! # Invariants
//! - A validated config always yields a working hasher and token issuer.

use crate::auth::credential::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::auth::token::{DEFAULT_TOKEN_TTL, MIN_SECRET_LEN};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for the points directory.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Directory holding uploaded point images.
    pub upload_dir: PathBuf,
    /// Base URL under which `upload_dir` is served.
    pub asset_base_url: String,
    /// Base URL under which item catalog images are served.
    #[serde(default)]
    pub item_image_base_url: Option<String>,
    /// HMAC secret for access tokens.
    pub token_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("database_path", &self.database_path)
            .field("upload_dir", &self.upload_dir)
            .field("asset_base_url", &self.asset_base_url)
            .field("item_image_base_url", &self.item_image_base_url)
            .field("token_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

/// Configuration loading or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl ServiceConfig {
    /// Builds a config with defaults for every optional setting.
    pub fn new(
        database_path: impl Into<PathBuf>,
        upload_dir: impl Into<PathBuf>,
        asset_base_url: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            database_path: database_path.into(),
            upload_dir: upload_dir.into(),
            asset_base_url: asset_base_url.into(),
            item_image_base_url: None,
            token_secret: token_secret.into(),
            token_ttl_secs: default_token_ttl_secs(),
            bcrypt_cost: default_bcrypt_cost(),
            log_level: None,
            log_dir: None,
        }
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("asset_base_url", &self.asset_base_url)?;
        if let Some(url) = self.item_image_base_url.as_deref() {
            validate_base_url("item_image_base_url", url)?;
        }
        if self.token_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                field: "token_secret",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "token_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                field: "bcrypt_cost",
                reason: format!("must be within {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"),
            });
        }
        if let Some(dir) = self.log_dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    reason: "must be an absolute path".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Item images default to the upload base URL.
    pub fn item_image_base_url(&self) -> &str {
        self.item_image_base_url
            .as_deref()
            .unwrap_or(&self.asset_base_url)
    }
}

fn validate_base_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| trimmed.len() > scheme.len() && trimmed.starts_with(scheme));
    if has_host {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected an http(s) URL, got `{trimmed}`"),
        })
    }
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL.as_secs()
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}
