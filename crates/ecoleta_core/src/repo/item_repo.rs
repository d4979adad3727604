//! Item catalog repository.
//!
//! The catalog is reference data seeded by migrations; this core only reads
//! it.

use crate::model::item::{Item, ItemId};
use crate::model::point::PointId;
use crate::repo::ensure_tables_ready;
use crate::repo::point_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeSet;

/// Read-only access to the item catalog.
pub trait ItemRepository {
    /// Lists every catalog item ordered by id.
    fn list_items(&self) -> RepoResult<Vec<Item>>;
}

/// SQLite-backed item catalog.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, &["items"])?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, image FROM items ORDER BY id ASC;")?;
        let items = stmt
            .query_map([], parse_item_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }
}

/// Loads the items currently associated with one point, ordered by id.
pub(crate) fn load_items_for_point(
    conn: &Connection,
    point_id: PointId,
) -> RepoResult<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.title, i.image
         FROM items i
         INNER JOIN point_items pi ON pi.item_id = i.id
         WHERE pi.point_id = ?1
         ORDER BY i.id ASC;",
    )?;
    let items = stmt
        .query_map([point_id], parse_item_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Fails with `UnknownItems` when any id is missing from the catalog.
pub(crate) fn ensure_items_exist(
    conn: &Connection,
    items: &BTreeSet<ItemId>,
) -> RepoResult<()> {
    if items.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; items.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM items WHERE id IN ({placeholders});"
    ))?;
    let found = stmt
        .query_map(
            params_from_iter(items.iter().map(|id| Value::Integer(*id))),
            |row| row.get::<_, ItemId>(0),
        )?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;

    let missing: Vec<ItemId> = items.difference(&found).copied().collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RepoError::UnknownItems(missing))
    }
}

fn parse_item_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get("id")?,
        title: row.get("title")?,
        image: row.get("image")?,
    })
}
