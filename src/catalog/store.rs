//! Memory store — the durable record of every cataloged file.
//!
//! [`upsert_memory`] is the single write entry point: it enforces path
//! uniqueness and inserts or refreshes one row inside a transaction.
//! Removal fixes up tag counts in the same transaction so the tag store
//! never drifts. Reads come in by-id, by-path, and by-source flavors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::error::CatalogError;
use crate::catalog::types::{Memory, MemoryKind};

const MEMORY_COLUMNS: &str =
    "id, path, source_path, kind, size_bytes, title, description, language, modified_at, indexed_at";

/// Insert or overwrite a memory by id.
///
/// Fails with [`CatalogError::Conflict`] if another memory already owns the
/// path under a different id. Does not touch the tag set; tags survive
/// re-ingestion by design.
pub fn upsert_memory(conn: &mut Connection, memory: &Memory) -> Result<(), CatalogError> {
    let tx = conn.transaction()?;

    let owner: Option<String> = tx
        .query_row(
            "SELECT id FROM memories WHERE path = ?1",
            params![memory.path],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(owner_id) = owner {
        if owner_id != memory.id {
            return Err(CatalogError::Conflict(format!(
                "path {} already owned by memory {owner_id}",
                memory.path
            )));
        }
    }

    tx.execute(
        "INSERT INTO memories (id, path, source_path, kind, size_bytes, title, description, language, modified_at, indexed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT(id) DO UPDATE SET \
           path = excluded.path, \
           source_path = excluded.source_path, \
           kind = excluded.kind, \
           size_bytes = excluded.size_bytes, \
           title = excluded.title, \
           description = excluded.description, \
           language = excluded.language, \
           modified_at = excluded.modified_at, \
           indexed_at = excluded.indexed_at",
        params![
            memory.id,
            memory.path,
            memory.source_path,
            memory.kind.as_str(),
            memory.size_bytes,
            memory.title,
            memory.description,
            memory.language,
            memory.modified_at.to_rfc3339(),
            memory.indexed_at.to_rfc3339(),
        ],
    )?;

    tx.commit()?;
    Ok(())
}

/// Fetch a memory by id, including its tag set.
pub fn get_memory(conn: &Connection, id: &str) -> Result<Memory, CatalogError> {
    let row = query_one(conn, "WHERE id = ?1", id)?
        .ok_or_else(|| CatalogError::NotFound(format!("memory {id}")))?;
    let tags = tags_for_memory(conn, &row.id)?;
    row_to_memory(row, tags)
}

/// Fetch a memory by path, if one exists. Used by the scanner to decide
/// between insert and refresh.
pub fn get_memory_by_path(conn: &Connection, path: &str) -> Result<Option<Memory>, CatalogError> {
    let Some(row) = query_one(conn, "WHERE path = ?1", path)? else {
        return Ok(None);
    };
    let tags = tags_for_memory(conn, &row.id)?;
    row_to_memory(row, tags).map(Some)
}

/// Delete a memory and return whether it existed.
///
/// Decrements the counts of its tags (dropping rows that reach zero) in the
/// same transaction, so a crash cannot leave counts out of step with the
/// junction table. Deleting an absent memory is a no-op, which makes
/// partial cascades safe to retry.
pub fn remove_memory(conn: &mut Connection, id: &str) -> Result<bool, CatalogError> {
    let tx = conn.transaction()?;

    let tags = {
        let mut stmt = tx.prepare("SELECT tag FROM memory_tags WHERE memory_id = ?1")?;
        let rows: Vec<String> = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let removed = tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    if removed == 0 {
        return Ok(false);
    }

    for tag in &tags {
        tx.execute(
            "UPDATE tags SET count = count - 1 WHERE name = ?1",
            params![tag],
        )?;
    }
    tx.execute("DELETE FROM tags WHERE count <= 0", [])?;

    tx.commit()?;
    Ok(true)
}

/// All memories owned by a source, ordered by id so interrupted cascades
/// can resume deterministically.
pub fn list_by_source(conn: &Connection, source_path: &str) -> Result<Vec<Memory>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE source_path = ?1 ORDER BY id"
    ))?;
    let rows: Vec<MemoryRow> = stmt
        .query_map(params![source_path], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    attach_tags(conn, rows)
}

/// Every memory in the catalog, ordered by id. Used for index rebuilds.
pub fn list_all_memories(conn: &Connection) -> Result<Vec<Memory>, CatalogError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {MEMORY_COLUMNS} FROM memories ORDER BY id"))?;
    let rows: Vec<MemoryRow> = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    attach_tags(conn, rows)
}

/// Fetch memories by id, preserving the order of `ids`. Missing ids are
/// silently dropped, which keeps a paged result from ever referencing a
/// record removed between ranking and fetch.
pub fn fetch_memories(conn: &Connection, ids: &[String]) -> Result<Vec<Memory>, CatalogError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<MemoryRow> = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut fetched: HashMap<String, Memory> = attach_tags(conn, rows)?
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    Ok(ids.iter().filter_map(|id| fetched.remove(id)).collect())
}

/// Tag names for one memory, sorted.
pub fn tags_for_memory(conn: &Connection, id: &str) -> Result<Vec<String>, CatalogError> {
    let mut stmt =
        conn.prepare("SELECT tag FROM memory_tags WHERE memory_id = ?1 ORDER BY tag")?;
    let tags: Vec<String> = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Raw row shape before kind/timestamp parsing.
struct MemoryRow {
    id: String,
    path: String,
    source_path: String,
    kind: String,
    size_bytes: i64,
    title: Option<String>,
    description: Option<String>,
    language: Option<String>,
    modified_at: String,
    indexed_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRow> {
    Ok(MemoryRow {
        id: row.get(0)?,
        path: row.get(1)?,
        source_path: row.get(2)?,
        kind: row.get(3)?,
        size_bytes: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        language: row.get(7)?,
        modified_at: row.get(8)?,
        indexed_at: row.get(9)?,
    })
}

fn query_one(
    conn: &Connection,
    where_clause: &str,
    param: &str,
) -> Result<Option<MemoryRow>, CatalogError> {
    let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories {where_clause}");
    let row = conn
        .query_row(&sql, params![param], read_row)
        .optional()?;
    Ok(row)
}

/// Load tag sets for a batch of rows with a single junction query.
fn attach_tags(conn: &Connection, rows: Vec<MemoryRow>) -> Result<Vec<Memory>, CatalogError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=rows.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT memory_id, tag FROM memory_tags WHERE memory_id IN ({}) ORDER BY tag",
        placeholders.join(", ")
    );

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let pairs: Vec<(String, String)> = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_id: HashMap<String, Vec<String>> = HashMap::new();
    for (memory_id, tag) in pairs {
        by_id.entry(memory_id).or_default().push(tag);
    }

    rows.into_iter()
        .map(|row| {
            let tags = by_id.remove(&row.id).unwrap_or_default();
            row_to_memory(row, tags)
        })
        .collect()
}

fn row_to_memory(row: MemoryRow, tags: Vec<String>) -> Result<Memory, CatalogError> {
    Ok(Memory {
        kind: parse_kind(&row.kind)?,
        modified_at: parse_ts(&row.modified_at)?,
        indexed_at: parse_ts(&row.indexed_at)?,
        id: row.id,
        path: row.path,
        source_path: row.source_path,
        size_bytes: row.size_bytes,
        title: row.title,
        description: row.description,
        language: row.language,
        tags,
    })
}

fn parse_kind(raw: &str) -> Result<MemoryKind, CatalogError> {
    raw.parse()
        .map_err(|e: String| CatalogError::Internal(anyhow::anyhow!(e)))
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::Internal(anyhow::anyhow!("invalid timestamp {raw:?}: {e}")))
}
