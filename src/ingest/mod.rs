//! Ingestion: walking source roots and syncing the catalog with disk.
//!
//! A scan discovers files under a source, classifies them by extension,
//! upserts new and changed records, tombstones records whose files are
//! gone, and generates thumbnails for new image memories. Per-file errors
//! are collected in the report and never abort the rest of the scan.

pub mod classify;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::catalog::error::CatalogError;
use crate::catalog::lock_db;
use crate::catalog::store;
use crate::catalog::types::{Memory, MemoryKind, ScanFailure, ScanReport, Source};
use crate::search::SearchIndex;
use crate::thumbs::ThumbnailCache;

enum FileOutcome {
    Added(Memory),
    Updated(Memory),
    Unchanged,
}

/// Walk a source root and bring store, index, and thumbnail cache in step
/// with the filesystem.
///
/// The database lock is taken once per file, never for the whole walk, so
/// queries interleave freely with a long scan. Re-running a scan is
/// idempotent: unchanged files are no-ops and the tombstone pass only
/// removes what is actually gone.
pub fn scan_source(
    db: &Mutex<Connection>,
    index: &SearchIndex,
    thumbs: &ThumbnailCache,
    source: &Source,
) -> Result<ScanReport, CatalogError> {
    info!(source = %source.path, "scan started");
    let mut report = ScanReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut new_images: Vec<Memory> = Vec::new();

    // 1. Discovery walk: upsert every classifiable file
    for entry in WalkDir::new(&source.path)
        .follow_links(false)
        .into_iter()
        .filter_entry(classify::should_visit)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| source.path.clone());
                report.failures.push(ScanFailure {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = classify::classify(entry.path()) else {
            debug!(path = %entry.path().display(), "skipping unrecognized file");
            continue;
        };

        // The file exists on disk whatever happens next, so it is never a
        // tombstone candidate even if this pass fails on it.
        seen.insert(entry.path().to_string_lossy().into_owned());

        match sync_file(db, entry.path(), kind, source) {
            Ok(FileOutcome::Added(memory)) => {
                report.added += 1;
                index.upsert(&memory);
                if memory.kind == MemoryKind::Image {
                    new_images.push(memory);
                }
            }
            Ok(FileOutcome::Updated(memory)) => {
                report.updated += 1;
                index.upsert(&memory);
                if memory.kind == MemoryKind::Image && !thumbs.is_ready(&memory) {
                    new_images.push(memory);
                }
            }
            Ok(FileOutcome::Unchanged) => report.unchanged += 1,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to ingest file");
                report.failures.push(ScanFailure {
                    path: entry.path().display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // 2. Tombstone pass: drop records whose files are gone. Index entry
    //    first, store record last, so the index never holds an id the
    //    store has already lost.
    let stored = {
        let conn = lock_db(db)?;
        store::list_by_source(&conn, &source.path)?
    };
    for memory in stored {
        if seen.contains(&memory.path) {
            continue;
        }
        index.remove(&memory.id);
        thumbs.remove(&memory.path);
        let mut conn = lock_db(db)?;
        if store::remove_memory(&mut conn, &memory.id)? {
            report.removed += 1;
        }
    }

    // 3. Thumbnails for the images this scan brought in
    for memory in &new_images {
        if let Err(e) = thumbs.ensure(memory) {
            warn!(path = %memory.path, error = %e, "thumbnail generation failed");
            report.failures.push(ScanFailure {
                path: memory.path.clone(),
                reason: e.to_string(),
            });
        }
    }

    info!(
        source = %source.path,
        added = report.added,
        updated = report.updated,
        unchanged = report.unchanged,
        removed = report.removed,
        failed = report.failed(),
        "scan finished"
    );
    Ok(report)
}

/// Upsert one discovered file. Tags and description survive updates; only
/// filesystem-derived fields are refreshed. A file already owned by a
/// different overlapping source keeps its original owner.
fn sync_file(
    db: &Mutex<Connection>,
    path: &Path,
    kind: MemoryKind,
    source: &Source,
) -> Result<FileOutcome, CatalogError> {
    let metadata = fs::metadata(path)?;
    let modified_at: DateTime<Utc> = metadata.modified()?.into();
    let path_str = path.to_string_lossy().into_owned();

    let mut conn = lock_db(db)?;
    match store::get_memory_by_path(&conn, &path_str)? {
        Some(current) => {
            if modified_at <= current.indexed_at {
                return Ok(FileOutcome::Unchanged);
            }
            let refreshed = Memory {
                kind,
                size_bytes: metadata.len() as i64,
                title: title_for(path),
                language: classify::detect_language(path).map(str::to_string),
                modified_at,
                indexed_at: Utc::now(),
                ..current
            };
            store::upsert_memory(&mut conn, &refreshed)?;
            Ok(FileOutcome::Updated(refreshed))
        }
        None => {
            let memory = Memory {
                id: Uuid::now_v7().to_string(),
                path: path_str,
                source_path: source.path.clone(),
                kind,
                size_bytes: metadata.len() as i64,
                title: title_for(path),
                description: None,
                language: classify::detect_language(path).map(str::to_string),
                modified_at,
                indexed_at: Utc::now(),
                tags: Vec::new(),
            };
            store::upsert_memory(&mut conn, &memory)?;
            Ok(FileOutcome::Added(memory))
        }
    }
}

fn title_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
