//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for points and items.
//! - Isolate SQLite query details from service orchestration.
//! - Own the unit-of-work boundary for multi-table point writes.
//!
//! # Invariants
//! - Point rows and their `point_items` associations are written in one
//!   transaction; partial writes are never committed.
//! - `points.email` uniqueness is enforced by the schema; violations surface
//!   as `RepoError::DuplicateEmail`.

use rusqlite::Connection;

pub mod item_repo;
pub mod point_repo;

pub(crate) fn ensure_tables_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> point_repo::RepoResult<()> {
    for table in tables {
        if !table_exists(conn, table)? {
            return Err(point_repo::RepoError::MissingRequiredTable(*table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> point_repo::RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
