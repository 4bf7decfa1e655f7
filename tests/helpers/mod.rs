#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use memex::catalog::types::{Memory, MemoryKind, SearchQuery, SourceType, TagFilter};
use memex::catalog::{sources, store, Catalog};
use memex::config::MemexConfig;
use memex::db;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Build a config with the database and thumbnail cache under `root`.
pub fn test_config(root: &TempDir) -> MemexConfig {
    let mut config = MemexConfig::default();
    config.storage.db_path = root
        .path()
        .join("index.db")
        .to_string_lossy()
        .into_owned();
    config.thumbnails.dir = root.path().join("thumbs").to_string_lossy().into_owned();
    config
}

/// Open a catalog whose state lives under `root`.
pub fn test_catalog(root: &TempDir) -> Catalog {
    Catalog::open(&test_config(root)).unwrap()
}

/// Write a file under `dir`, creating parents as needed. Returns its path.
pub fn write_file(dir: &Path, rel: &str, contents: &[u8]) -> String {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// Write a small valid PNG. Returns its path.
pub fn write_png(dir: &Path, rel: &str, width: u32, height: u32) -> String {
    write_image(dir, rel, width, height, image::ImageFormat::Png)
}

/// Write a small valid JPEG. Returns its path.
pub fn write_jpeg(dir: &Path, rel: &str, width: u32, height: u32) -> String {
    write_image(dir, rel, width, height, image::ImageFormat::Jpeg)
}

fn write_image(
    dir: &Path,
    rel: &str,
    width: u32,
    height: u32,
    format: image::ImageFormat,
) -> String {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 251) as u8, 64])
    });
    img.save_with_format(&path, format).unwrap();
    path.to_string_lossy().into_owned()
}

/// Backdate a memory's `indexed_at` in the on-disk database so the next scan
/// sees the file as newer. Opens its own connection; safe alongside an open
/// catalog because the database runs in WAL mode.
pub fn backdate_indexed_at(db_path: &Path, memory_path: &str) {
    let conn = Connection::open(db_path).unwrap();
    conn.execute(
        "UPDATE memories SET indexed_at = '2000-01-01T00:00:00+00:00' WHERE path = ?1",
        [memory_path],
    )
    .unwrap();
}

/// Register a source row directly, for store-level tests.
pub fn register_source(conn: &Connection, path: &str) {
    sources::add_source(conn, path, SourceType::Local).unwrap();
}

/// Build a memory record with sane defaults for direct store inserts.
pub fn sample_memory(id: &str, path: &str, source: &str, kind: MemoryKind) -> Memory {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string);
    Memory {
        id: id.to_string(),
        path: path.to_string(),
        source_path: source.to_string(),
        kind,
        size_bytes: 1024,
        title: stem,
        description: None,
        language: None,
        modified_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        indexed_at: Utc::now(),
        tags: Vec::new(),
    }
}

/// Insert a memory directly through the store. The source row must exist.
pub fn insert_memory(
    conn: &mut Connection,
    id: &str,
    path: &str,
    source: &str,
    kind: MemoryKind,
) -> Memory {
    let memory = sample_memory(id, path, source, kind);
    store::upsert_memory(conn, &memory).unwrap();
    memory
}

/// A query matching everything, first page, default ordering.
pub fn query_all() -> SearchQuery {
    SearchQuery::default()
}

/// A text query with default filters and paging.
pub fn query_text(text: &str) -> SearchQuery {
    SearchQuery {
        text: Some(text.to_string()),
        ..SearchQuery::default()
    }
}

/// A query requiring one tag.
pub fn query_include_tag(tag: &str) -> SearchQuery {
    SearchQuery {
        tags: TagFilter {
            include: vec![tag.to_string()],
            exclude: Vec::new(),
        },
        ..SearchQuery::default()
    }
}
