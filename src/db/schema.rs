//! SQL DDL for all memex tables.
//!
//! Defines the `sources`, `memories`, `memory_tags`, `tags`, and
//! `schema_meta` tables. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const CATALOG_DDL: &str = r#"
-- Registered source roots
CREATE TABLE IF NOT EXISTS sources (
    path TEXT PRIMARY KEY,
    source_type TEXT NOT NULL DEFAULT 'local' CHECK(source_type IN ('local')),
    added_at TEXT NOT NULL
);

-- One row per cataloged file
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    source_path TEXT NOT NULL REFERENCES sources(path),
    kind TEXT NOT NULL CHECK(kind IN ('image','video','audio','code','document','other')),
    size_bytes INTEGER NOT NULL DEFAULT 0,
    title TEXT,
    description TEXT,
    language TEXT,
    modified_at TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_source ON memories(source_path);
CREATE INDEX IF NOT EXISTS idx_memories_kind ON memories(kind);

-- Memory <-> tag associations
CREATE TABLE IF NOT EXISTS memory_tags (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (memory_id, tag)
);

-- Denormalized tag usage counts
CREATE TABLE IF NOT EXISTS tags (
    name TEXT PRIMARY KEY,
    count INTEGER NOT NULL DEFAULT 0
);

-- Version bookkeeping
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Create every catalog table. Safe to run against an existing database.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CATALOG_DDL)?;

    // Stamp a fresh database at version 1; an existing row wins.
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
