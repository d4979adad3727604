#![allow(dead_code)]

use ecoleta_core::repo::point_repo::{PointChanges, PointDraft, StoredPoint};
use ecoleta_core::{
    open_db, AssetError, AssetStore, AssetUrlBuilder, BcryptHasher, DiskAssetStore,
    HmacTokenIssuer, Item, ItemId, NewPoint, Point, PointDetails, PointFilter, PointId,
    PointListQuery, PointPatch, PointQueryService, PointRegistrationService, PointRepository,
    PointServiceError, PointSummary, RegistrationContext, RegistrationReceipt, RepoError,
    RepoResult, RetiredAsset, SqlitePointRepository, MIN_BCRYPT_COST,
};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TOKEN_SECRET: &str = "integration-test-secret-0123";
pub const ASSET_BASE_URL: &str = "http://localhost:3333/uploads";

/// Temp database plus upload directory shared by one test.
pub struct Fixture {
    _dir: TempDir,
    pub db_path: PathBuf,
    pub assets: Arc<DiskAssetStore>,
    pub tokens: Arc<HmacTokenIssuer>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ecoleta.db");
        let assets = DiskAssetStore::open(dir.path().join("uploads")).unwrap();
        // Migrate once up front so concurrent tests start from a ready schema.
        drop(open_db(&db_path).unwrap());
        Self {
            db_path,
            assets: Arc::new(assets),
            tokens: Arc::new(
                HmacTokenIssuer::new(TOKEN_SECRET, Duration::from_secs(3600)).unwrap(),
            ),
            _dir: dir,
        }
    }

    pub fn connect(&self) -> Connection {
        open_db(&self.db_path).unwrap()
    }

    pub fn upload(&self, name: &str) -> String {
        self.assets.store(name, b"image-bytes").unwrap()
    }

    pub fn context(&self) -> RegistrationContext {
        self.context_with_assets(self.assets.clone())
    }

    pub fn context_with_assets(&self, assets: Arc<dyn AssetStore>) -> RegistrationContext {
        RegistrationContext {
            credentials: Arc::new(BcryptHasher::new(MIN_BCRYPT_COST).unwrap()),
            tokens: self.tokens.clone(),
            assets,
            urls: AssetUrlBuilder::new(ASSET_BASE_URL),
        }
    }

    pub fn register(&self, candidate: NewPoint) -> Result<RegistrationReceipt, PointServiceError> {
        self.register_with(self.context(), candidate)
    }

    pub fn register_with(
        &self,
        ctx: RegistrationContext,
        candidate: NewPoint,
    ) -> Result<RegistrationReceipt, PointServiceError> {
        let mut conn = self.connect();
        let repo = SqlitePointRepository::try_new(&mut conn).unwrap();
        PointRegistrationService::new(repo, ctx).create(candidate)
    }

    pub fn update(
        &self,
        original_email: &str,
        patch: PointPatch,
    ) -> Result<PointDetails, PointServiceError> {
        self.update_with(self.context(), original_email, patch)
    }

    pub fn update_with(
        &self,
        ctx: RegistrationContext,
        original_email: &str,
        patch: PointPatch,
    ) -> Result<PointDetails, PointServiceError> {
        let mut conn = self.connect();
        let repo = SqlitePointRepository::try_new(&mut conn).unwrap();
        PointRegistrationService::new(repo, ctx).update(original_email, patch)
    }

    /// Runs an update whose unit of work fails right after the asset step.
    pub fn update_rejecting_commit(
        &self,
        original_email: &str,
        patch: PointPatch,
    ) -> Result<PointDetails, PointServiceError> {
        let mut conn = self.connect();
        let repo = CommitRejectingRepo {
            inner: SqlitePointRepository::try_new(&mut conn).unwrap(),
        };
        PointRegistrationService::new(repo, self.context()).update(original_email, patch)
    }

    /// Filenames currently in the upload directory, tombstones included.
    pub fn upload_dir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.assets.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegistrationReceipt, PointServiceError> {
        let mut conn = self.connect();
        let repo = SqlitePointRepository::try_new(&mut conn).unwrap();
        PointRegistrationService::new(repo, self.context()).authenticate(email, password)
    }

    pub fn list(&self, filter: &PointFilter) -> Result<Vec<PointSummary>, PointServiceError> {
        let mut conn = self.connect();
        let repo = SqlitePointRepository::try_new(&mut conn).unwrap();
        PointQueryService::new(repo, AssetUrlBuilder::new(ASSET_BASE_URL)).list(filter)
    }

    pub fn show(&self, id: PointId) -> Result<PointDetails, PointServiceError> {
        let mut conn = self.connect();
        let repo = SqlitePointRepository::try_new(&mut conn).unwrap();
        PointQueryService::new(repo, AssetUrlBuilder::new(ASSET_BASE_URL)).show(id)
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.connect().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    pub fn stored_items(&self, point_id: PointId) -> Vec<ItemId> {
        let conn = self.connect();
        let mut stmt = conn
            .prepare("SELECT item_id FROM point_items WHERE point_id = ?1 ORDER BY item_id;")
            .unwrap();
        let ids = stmt
            .query_map([point_id], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<ItemId>>>()
            .unwrap();
        ids
    }

    pub fn stored_hash(&self, point_id: PointId) -> String {
        self.connect()
            .query_row("SELECT password FROM points WHERE id = ?1;", [point_id], |row| {
                row.get(0)
            })
            .unwrap()
    }
}

pub fn new_point(email: &str, items: &[ItemId], image: Option<String>) -> NewPoint {
    NewPoint {
        name: "Mercado Central".to_string(),
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        whatsapp: "5511999990000".to_string(),
        latitude: -23.55,
        longitude: -46.63,
        city: "Sao Paulo".to_string(),
        uf: "SP".to_string(),
        items: item_set(items),
        image,
    }
}

pub fn item_set(items: &[ItemId]) -> BTreeSet<ItemId> {
    items.iter().copied().collect()
}

pub fn item_ids(details: &PointDetails) -> Vec<ItemId> {
    details.items.iter().map(|item| item.id).collect()
}

/// Asset store that cannot move replaced images aside, for rollback checks.
pub struct FailingRetireStore {
    pub inner: Arc<DiskAssetStore>,
}

impl AssetStore for FailingRetireStore {
    fn contains(&self, filename: &str) -> bool {
        self.inner.contains(filename)
    }

    fn release(&self, filename: &str) -> Result<(), AssetError> {
        self.inner.release(filename)
    }

    fn retire(&self, filename: &str) -> Result<RetiredAsset, AssetError> {
        Err(AssetError::Io {
            filename: filename.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn restore(&self, retired: &RetiredAsset) -> Result<(), AssetError> {
        self.inner.restore(retired)
    }
}

/// Point repository whose updates run `before_commit` and then fail as a
/// rejected commit would.
pub struct CommitRejectingRepo<'conn> {
    pub inner: SqlitePointRepository<'conn>,
}

impl PointRepository for CommitRejectingRepo<'_> {
    fn find_by_email(&self, email: &str) -> RepoResult<Option<StoredPoint>> {
        self.inner.find_by_email(email)
    }

    fn get_point(&self, id: PointId) -> RepoResult<Option<Point>> {
        self.inner.get_point(id)
    }

    fn list_points(&self, query: &PointListQuery) -> RepoResult<Vec<Point>> {
        self.inner.list_points(query)
    }

    fn items_for_point(&self, id: PointId) -> RepoResult<Vec<Item>> {
        self.inner.items_for_point(id)
    }

    fn create_point<T, E, F>(
        &mut self,
        draft: &PointDraft,
        items: &BTreeSet<ItemId>,
        before_commit: F,
    ) -> Result<(Point, T), E>
    where
        F: FnOnce(&Point) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.inner.create_point(draft, items, before_commit)
    }

    fn update_point<E, F>(
        &mut self,
        original_email: &str,
        changes: &PointChanges,
        items: Option<&BTreeSet<ItemId>>,
        before_commit: F,
    ) -> Result<(Point, Vec<Item>), E>
    where
        F: FnOnce(&Point, &Point) -> Result<(), E>,
        E: From<RepoError>,
    {
        self.inner
            .update_point(original_email, changes, items, |previous, updated| {
                before_commit(previous, updated)?;
                Err(E::from(RepoError::InvalidData("commit rejected".to_string())))
            })
    }
}
