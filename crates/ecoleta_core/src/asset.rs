//! Image asset storage and URL decoration.
//!
//! # Responsibility
//! - Store uploaded point images under one directory, addressed by filename.
//! - Retire replaced images inside a point update and purge or restore them
//!   once the update commits or rolls back.
//! - Rewrite stored filenames into externally resolvable URLs.
//!
//! # Invariants
//! - Filenames are single path components; anything else is rejected.
//! - Releasing an already missing file counts as released.
//! - A retired asset is only renamed; its bytes survive until `purge`.

use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Asset storage failure.
#[derive(Debug)]
pub enum AssetError {
    /// Filename is empty or contains path components.
    InvalidFilename(String),
    Io { filename: String, source: io::Error },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFilename(name) => write!(f, "invalid asset filename `{name}`"),
            Self::Io { filename, source } => write!(f, "asset `{filename}` io error: {source}"),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFilename(_) => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

const TOMBSTONE_SUFFIX: &str = ".retired";

/// Asset moved aside by `AssetStore::retire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredAsset {
    pub filename: String,
    /// `None` when the asset was already missing at retire time.
    pub tombstone: Option<String>,
}

/// Store of image assets referenced by point rows.
pub trait AssetStore: Send + Sync {
    /// Returns whether an asset with this filename is currently stored.
    fn contains(&self, filename: &str) -> bool;
    /// Deletes an asset.
    fn release(&self, filename: &str) -> Result<(), AssetError>;
    /// Moves a replaced asset out of reach without deleting it. Failure
    /// aborts the enclosing unit of work.
    fn retire(&self, filename: &str) -> Result<RetiredAsset, AssetError>;
    /// Puts a retired asset back under its original name.
    fn restore(&self, retired: &RetiredAsset) -> Result<(), AssetError>;
    /// Deletes a retired asset for good.
    fn purge(&self, retired: &RetiredAsset) -> Result<(), AssetError> {
        match retired.tombstone.as_deref() {
            Some(tombstone) => self.release(tombstone),
            None => Ok(()),
        }
    }
    /// Best-effort removal of a freshly stored asset whose write failed.
    fn discard(&self, filename: &str) {
        if let Err(err) = self.release(filename) {
            warn!("event=asset_discard module=asset status=error error={err}");
        }
    }
}

/// Filesystem-backed asset store rooted at the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskAssetStore {
    root: PathBuf,
}

impl DiskAssetStore {
    /// Opens the store, creating the upload directory when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| AssetError::Io {
            filename: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an uploaded file under a unique name and returns that name.
    ///
    /// Only the final component of `original_name` is kept, prefixed with a
    /// random id so concurrent uploads of the same name never collide.
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String, AssetError> {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AssetError::InvalidFilename(original_name.to_string()))?;

        let filename = format!("{}-{base}", Uuid::new_v4().simple());
        let path = self.path_for(&filename)?;
        std::fs::write(&path, bytes).map_err(|source| AssetError::Io {
            filename: filename.clone(),
            source,
        })?;
        debug!(
            "event=asset_store module=asset status=ok bytes={}",
            bytes.len()
        );
        Ok(filename)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let (Ok(from_path), Ok(to_path)) = (self.path_for(from), self.path_for(to)) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "asset names must be single path components",
            ));
        };
        std::fs::rename(from_path, to_path)
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, AssetError> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(name)), None) if name == filename => {
                Ok(self.root.join(filename))
            }
            _ => Err(AssetError::InvalidFilename(filename.to_string())),
        }
    }
}

impl AssetStore for DiskAssetStore {
    fn contains(&self, filename: &str) -> bool {
        self.path_for(filename)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn release(&self, filename: &str) -> Result<(), AssetError> {
        let path = self.path_for(filename)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("event=asset_release module=asset status=missing");
                Ok(())
            }
            Err(source) => Err(AssetError::Io {
                filename: filename.to_string(),
                source,
            }),
        }
    }

    fn retire(&self, filename: &str) -> Result<RetiredAsset, AssetError> {
        self.path_for(filename)?;
        let tombstone = format!("{filename}{TOMBSTONE_SUFFIX}");
        match self.rename(filename, &tombstone) {
            Ok(()) => Ok(RetiredAsset {
                filename: filename.to_string(),
                tombstone: Some(tombstone),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("event=asset_retire module=asset status=missing");
                Ok(RetiredAsset {
                    filename: filename.to_string(),
                    tombstone: None,
                })
            }
            Err(source) => Err(AssetError::Io {
                filename: filename.to_string(),
                source,
            }),
        }
    }

    fn restore(&self, retired: &RetiredAsset) -> Result<(), AssetError> {
        let Some(tombstone) = retired.tombstone.as_deref() else {
            return Ok(());
        };
        self.rename(tombstone, &retired.filename)
            .map_err(|source| AssetError::Io {
                filename: retired.filename.clone(),
                source,
            })
    }
}

/// Joins stored filenames onto a configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrlBuilder {
    base: String,
}

impl AssetUrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.base, filename.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetStore, AssetUrlBuilder, DiskAssetStore};

    #[test]
    fn store_contains_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::open(dir.path().join("uploads")).unwrap();

        let name = store.store("../../etc/photo.png", b"png-bytes").unwrap();
        assert!(name.ends_with("-photo.png"));
        assert!(store.contains(&name));
        assert!(store.root().join(&name).is_file());

        store.release(&name).unwrap();
        assert!(!store.contains(&name));
        store.release(&name).unwrap();
    }

    #[test]
    fn retire_then_restore_or_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::open(dir.path()).unwrap();
        let name = store.store("old.png", b"old").unwrap();

        let retired = store.retire(&name).unwrap();
        assert!(!store.contains(&name));
        store.restore(&retired).unwrap();
        assert!(store.contains(&name));
        assert_eq!(std::fs::read(store.root().join(&name)).unwrap(), b"old");

        let retired = store.retire(&name).unwrap();
        store.purge(&retired).unwrap();
        assert!(!store.contains(&name));
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn retiring_a_missing_asset_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::open(dir.path()).unwrap();

        let retired = store.retire("gone.png").unwrap();
        assert_eq!(retired.tombstone, None);
        store.restore(&retired).unwrap();
        store.purge(&retired).unwrap();
        assert!(store.retire("../gone.png").is_err());
    }

    #[test]
    fn rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::open(dir.path()).unwrap();

        assert!(store.release("../outside.png").is_err());
        assert!(store.release("nested/file.png").is_err());
        assert!(!store.contains("../outside.png"));
        assert!(store.store("", b"x").is_err());
    }

    #[test]
    fn url_builder_joins_with_single_slash() {
        let urls = AssetUrlBuilder::new("http://localhost:3333/uploads/");
        assert_eq!(
            urls.url_for("photo.png"),
            "http://localhost:3333/uploads/photo.png"
        );
    }
}
