use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::catalog::error::CatalogError;
use crate::catalog::types::MemoryKind;

/// Snapshot of catalog-wide counts.
#[derive(Debug, Serialize)]
pub struct CatalogStats {
    pub total_memories: u64,
    pub by_kind: HashMap<String, u64>,
    pub total_size_bytes: u64,
    pub total_sources: u64,
    pub total_tags: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_indexed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_indexed: Option<String>,
}

/// Compute catalog statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory
/// databases.
pub fn catalog_stats(conn: &Connection, db_path: Option<&Path>) -> Result<CatalogStats, CatalogError> {
    let (total, total_size) = count_memories(conn)?;
    let by_kind = count_by_kind(conn)?;
    let total_sources = count_table(conn, "sources")?;
    let total_tags = count_table(conn, "tags")?;
    let (oldest, newest) = indexed_time_range(conn)?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(CatalogStats {
        total_memories: total,
        by_kind,
        total_size_bytes: total_size,
        total_sources,
        total_tags,
        db_size_bytes,
        oldest_indexed: oldest,
        newest_indexed: newest,
    })
}

/// Total record count and summed file sizes.
fn count_memories(conn: &Connection) -> Result<(u64, u64), CatalogError> {
    let (total, size): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), SUM(size_bytes) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((total as u64, size.unwrap_or(0) as u64))
}

/// Count by kind. Every kind appears in the map, zero included, so
/// clients can enumerate without special-casing sparse catalogs.
fn count_by_kind(conn: &Connection) -> Result<HashMap<String, u64>, CatalogError> {
    let mut map = HashMap::new();
    for kind in MemoryKind::ALL {
        map.insert(kind.as_str().to_string(), 0);
    }

    let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM memories GROUP BY kind")?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (kind, count) in rows {
        map.insert(kind, count as u64);
    }
    Ok(map)
}

fn count_table(conn: &Connection, table: &str) -> Result<u64, CatalogError> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}

/// Oldest and newest indexing timestamps.
fn indexed_time_range(conn: &Connection) -> Result<(Option<String>, Option<String>), CatalogError> {
    let range = conn.query_row(
        "SELECT MIN(indexed_at), MAX(indexed_at) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(range)
}
