//! Source registry and cascade removal.
//!
//! A source is a configured root path; every memory belongs to exactly one.
//! Removal cascades over the owned memories and deletes the source record
//! last, so a crash mid-cascade leaves the source registered and the whole
//! operation retryable.

use std::fs;
use std::io::ErrorKind;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::catalog::error::CatalogError;
use crate::catalog::lock_db;
use crate::catalog::store;
use crate::catalog::types::{RemoveSourceReport, ScanFailure, Source, SourceType};
use crate::search::SearchIndex;
use crate::thumbs::ThumbnailCache;

/// Register a new source root. Fails with `Conflict` if the path is
/// already registered.
pub fn add_source(
    conn: &Connection,
    path: &str,
    source_type: SourceType,
) -> Result<Source, CatalogError> {
    let added_at = Utc::now();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO sources (path, source_type, added_at) VALUES (?1, ?2, ?3)",
        params![path, source_type.as_str(), added_at.to_rfc3339()],
    )?;
    if inserted == 0 {
        return Err(CatalogError::Conflict(format!(
            "source already registered: {path}"
        )));
    }

    info!(path, "source registered");
    Ok(Source {
        path: path.to_string(),
        source_type,
        added_at,
    })
}

pub fn get_source(conn: &Connection, path: &str) -> Result<Source, CatalogError> {
    conn.query_row(
        "SELECT path, source_type, added_at FROM sources WHERE path = ?1",
        params![path],
        read_source_row,
    )
    .optional()?
    .transpose()?
    .ok_or_else(|| CatalogError::NotFound(format!("source not registered: {path}")))
}

pub fn list_sources(conn: &Connection) -> Result<Vec<Source>, CatalogError> {
    let mut stmt = conn.prepare("SELECT path, source_type, added_at FROM sources ORDER BY path")?;
    let rows: Vec<Result<Source, CatalogError>> = stmt
        .query_map([], read_source_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().collect()
}

/// Remove a source and every memory it owns.
///
/// Per memory: the index entry goes first (so a concurrent query can never
/// rank an id the store is about to lose), then the underlying file when
/// `delete_files` is set, then the thumbnail, then the store record. File
/// deletion is best effort; each failure is reported and the cascade
/// continues. The database lock is taken per memory, never for the whole
/// cascade.
pub fn remove_source(
    db: &Mutex<Connection>,
    index: &SearchIndex,
    thumbs: &ThumbnailCache,
    path: &str,
    delete_files: bool,
) -> Result<RemoveSourceReport, CatalogError> {
    let owned = {
        let conn = lock_db(db)?;
        get_source(&conn, path)?;
        store::list_by_source(&conn, path)?
    };

    let mut report = RemoveSourceReport::default();
    for memory in owned {
        index.remove(&memory.id);

        if delete_files {
            match fs::remove_file(&memory.path) {
                Ok(()) => report.files_deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %memory.path, error = %e, "failed to delete file");
                    report.failures.push(ScanFailure {
                        path: memory.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        thumbs.remove(&memory.path);

        let mut conn = lock_db(db)?;
        if store::remove_memory(&mut conn, &memory.id)? {
            report.memories_removed += 1;
        }
    }

    // Only once every owned memory is gone does the registration go,
    // keeping an interrupted cascade retryable.
    let conn = lock_db(db)?;
    conn.execute("DELETE FROM sources WHERE path = ?1", params![path])?;

    info!(
        path,
        memories_removed = report.memories_removed,
        files_deleted = report.files_deleted,
        failed = report.failures.len(),
        "source removed"
    );
    Ok(report)
}

fn read_source_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Source, CatalogError>> {
    let path: String = row.get(0)?;
    let source_type: String = row.get(1)?;
    let added_at: String = row.get(2)?;

    Ok(build_source(path, &source_type, &added_at))
}

fn build_source(path: String, source_type: &str, added_at: &str) -> Result<Source, CatalogError> {
    Ok(Source {
        path,
        source_type: source_type
            .parse()
            .map_err(|e: String| CatalogError::Internal(anyhow::anyhow!(e)))?,
        added_at: store::parse_ts(added_at)?,
    })
}
