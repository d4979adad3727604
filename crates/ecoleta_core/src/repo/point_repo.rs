//! Point repository and point-item association store.
//!
//! # Responsibility
//! - Persist point rows and their `point_items` associations.
//! - Run create/update as one `BEGIN IMMEDIATE` unit of work, with a
//!   caller-supplied hook that runs after all writes and before commit.
//! - Serve filtered listings and single-point reads.
//!
//! # Invariants
//! - Credential hashes are only readable through `StoredPoint`.
//! - Association sets are replaced wholesale, never patched.
//! - A failed hook, failed write, or failed commit leaves no trace: the
//!   transaction is dropped and rolled back.
//! - Concurrent units of work are serialized by the immediate write lock.

use crate::db::DbError;
use crate::model::item::{Item, ItemId};
use crate::model::point::{Point, PointId, PointKey};
use crate::repo::ensure_tables_ready;
use crate::repo::item_repo::{ensure_items_exist, load_items_for_point};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

const POINT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    whatsapp,
    latitude,
    longitude,
    city,
    uf,
    image
FROM points";

const STORED_POINT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    password,
    whatsapp,
    latitude,
    longitude,
    city,
    uf,
    image
FROM points";

const REQUIRED_TABLES: &[&str] = &["points", "point_items", "items"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for point, association and item persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    PointNotFound(PointKey),
    /// `points.email` is already taken by another row.
    DuplicateEmail,
    /// Association targets missing from the item catalog.
    UnknownItems(Vec<ItemId>),
    /// Connection schema lacks a table this repository needs.
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::PointNotFound(key) => write!(f, "point not found: {key}"),
            Self::DuplicateEmail => write!(f, "email already registered"),
            Self::UnknownItems(ids) => write!(f, "unknown item ids: {ids:?}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "point repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted point data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_unique_violation("points.email") {
            Self::DuplicateEmail
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Point row including its credential hash.
#[derive(Clone, PartialEq)]
pub struct StoredPoint {
    pub point: Point,
    pub password_hash: String,
}

impl Debug for StoredPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredPoint")
            .field("point", &self.point)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Fully normalized row for a point insert.
#[derive(Clone, PartialEq)]
pub struct PointDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub whatsapp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub uf: String,
    pub image: String,
}

impl Debug for PointDraft {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointDraft")
            .field("name", &self.name)
            .field("city", &self.city)
            .field("uf", &self.uf)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

/// Column changes for a point update. `None` keeps the stored value.
#[derive(Clone, Default, PartialEq)]
pub struct PointChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub whatsapp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub image: Option<String>,
}

impl Debug for PointChanges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointChanges")
            .field("name", &self.name)
            .field("password_changed", &self.password_hash.is_some())
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("city", &self.city)
            .field("uf", &self.uf)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

/// Listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointListQuery {
    /// Exact city match.
    pub city: String,
    /// Exact region code match.
    pub uf: String,
    /// When set, only points accepting at least one of these items match.
    pub items: Option<BTreeSet<ItemId>>,
}

/// Repository interface for points and their item associations.
pub trait PointRepository {
    /// Finds one point (with credential hash) by normalized contact identity.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<StoredPoint>>;
    /// Gets one point by id.
    fn get_point(&self, id: PointId) -> RepoResult<Option<Point>>;
    /// Lists distinct points matching the filter. Order is unspecified.
    fn list_points(&self, query: &PointListQuery) -> RepoResult<Vec<Point>>;
    /// Lists items associated with one point.
    fn items_for_point(&self, id: PointId) -> RepoResult<Vec<Item>>;

    /// Inserts a point and one association per item in one unit of work.
    ///
    /// `before_commit` runs after every write with the inserted point; its
    /// error aborts and rolls back the whole unit.
    fn create_point<T, E, F>(
        &mut self,
        draft: &PointDraft,
        items: &BTreeSet<ItemId>,
        before_commit: F,
    ) -> Result<(Point, T), E>
    where
        F: FnOnce(&Point) -> Result<T, E>,
        E: From<RepoError>;

    /// Updates the point currently registered under `original_email`.
    ///
    /// When `items` is set the association set is replaced by exactly that
    /// set. `before_commit` receives the previous and updated point; its
    /// error aborts and rolls back the whole unit. Returns the re-read point
    /// and its items.
    fn update_point<E, F>(
        &mut self,
        original_email: &str,
        changes: &PointChanges,
        items: Option<&BTreeSet<ItemId>>,
        before_commit: F,
    ) -> Result<(Point, Vec<Item>), E>
    where
        F: FnOnce(&Point, &Point) -> Result<(), E>,
        E: From<RepoError>;
}

/// SQLite-backed point repository.
pub struct SqlitePointRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePointRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl PointRepository for SqlitePointRepository<'_> {
    fn find_by_email(&self, email: &str) -> RepoResult<Option<StoredPoint>> {
        load_stored_point_by_email(self.conn, email)
    }

    fn get_point(&self, id: PointId) -> RepoResult<Option<Point>> {
        load_point(self.conn, id)
    }

    fn list_points(&self, query: &PointListQuery) -> RepoResult<Vec<Point>> {
        let mut sql = format!("{POINT_SELECT_SQL} WHERE city = ? AND uf = ?");
        let mut bind_values = vec![
            Value::Text(query.city.clone()),
            Value::Text(query.uf.clone()),
        ];

        if let Some(items) = query.items.as_ref() {
            if items.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; items.len()].join(", ");
            // EXISTS keeps one row per point however many items match.
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM point_items pi
                    WHERE pi.point_id = points.id
                      AND pi.item_id IN ({placeholders})
                )"
            ));
            bind_values.extend(items.iter().map(|id| Value::Integer(*id)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let points = stmt
            .query_map(params_from_iter(bind_values), parse_point_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }

    fn items_for_point(&self, id: PointId) -> RepoResult<Vec<Item>> {
        load_items_for_point(self.conn, id)
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
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        if email_taken(&tx, &draft.email, None)? {
            return Err(RepoError::DuplicateEmail.into());
        }
        ensure_items_exist(&tx, items)?;

        tx.execute(
            "INSERT INTO points (
                name,
                email,
                password,
                whatsapp,
                latitude,
                longitude,
                city,
                uf,
                image
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                draft.name.as_str(),
                draft.email.as_str(),
                draft.password_hash.as_str(),
                draft.whatsapp.as_str(),
                draft.latitude,
                draft.longitude,
                draft.city.as_str(),
                draft.uf.as_str(),
                draft.image.as_str(),
            ],
        )
        .map_err(RepoError::from)?;
        let point_id = tx.last_insert_rowid();

        insert_point_items(&tx, point_id, items)?;

        let point = load_point(&tx, point_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted point {point_id} missing in read-back"))
        })?;
        let extra = before_commit(&point)?;

        tx.commit().map_err(RepoError::from)?;
        Ok((point, extra))
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
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let previous = load_stored_point_by_email(&tx, original_email)?
            .ok_or_else(|| {
                RepoError::PointNotFound(PointKey::Email(original_email.to_string()))
            })?
            .point;

        if let Some(email) = changes.email.as_deref() {
            if email != previous.email && email_taken(&tx, email, Some(previous.id))? {
                return Err(RepoError::DuplicateEmail.into());
            }
        }

        tx.execute(
            "UPDATE points
             SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                password = COALESCE(?4, password),
                whatsapp = COALESCE(?5, whatsapp),
                latitude = COALESCE(?6, latitude),
                longitude = COALESCE(?7, longitude),
                city = COALESCE(?8, city),
                uf = COALESCE(?9, uf),
                image = COALESCE(?10, image),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                previous.id,
                changes.name.as_deref(),
                changes.email.as_deref(),
                changes.password_hash.as_deref(),
                changes.whatsapp.as_deref(),
                changes.latitude,
                changes.longitude,
                changes.city.as_deref(),
                changes.uf.as_deref(),
                changes.image.as_deref(),
            ],
        )
        .map_err(RepoError::from)?;

        if let Some(items) = items {
            ensure_items_exist(&tx, items)?;
            tx.execute("DELETE FROM point_items WHERE point_id = ?1;", [previous.id])
                .map_err(RepoError::from)?;
            insert_point_items(&tx, previous.id, items)?;
        }

        let updated = load_point(&tx, previous.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("updated point {} missing in read-back", previous.id))
        })?;
        let current_items = load_items_for_point(&tx, previous.id)?;
        before_commit(&previous, &updated)?;

        tx.commit().map_err(RepoError::from)?;
        Ok((updated, current_items))
    }
}

fn load_point(conn: &Connection, id: PointId) -> RepoResult<Option<Point>> {
    let point = conn
        .query_row(
            &format!("{POINT_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_point_row,
        )
        .optional()?;
    Ok(point)
}

fn load_stored_point_by_email(
    conn: &Connection,
    email: &str,
) -> RepoResult<Option<StoredPoint>> {
    let stored = conn
        .query_row(
            &format!("{STORED_POINT_SELECT_SQL} WHERE email = ?1;"),
            [email],
            |row| {
                Ok(StoredPoint {
                    point: parse_point_row(row)?,
                    password_hash: row.get("password")?,
                })
            },
        )
        .optional()?;
    Ok(stored)
}

fn email_taken(conn: &Connection, email: &str, except: Option<PointId>) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM points
            WHERE email = ?1
              AND (?2 IS NULL OR id <> ?2)
        );",
        params![email, except],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn insert_point_items(
    conn: &Connection,
    point_id: PointId,
    items: &BTreeSet<ItemId>,
) -> RepoResult<()> {
    let mut stmt =
        conn.prepare("INSERT INTO point_items (point_id, item_id) VALUES (?1, ?2);")?;
    for item_id in items {
        stmt.execute(params![point_id, item_id])?;
    }
    Ok(())
}

fn parse_point_row(row: &Row<'_>) -> rusqlite::Result<Point> {
    Ok(Point {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        whatsapp: row.get("whatsapp")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        city: row.get("city")?,
        uf: row.get("uf")?,
        image: row.get("image")?,
    })
}
