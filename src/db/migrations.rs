//! Forward-only schema migrations, versioned through `schema_meta`.

use rusqlite::Connection;

/// Ordered migration steps: entry `i` brings the schema from version `i + 1`
/// to version `i + 2`. Appending here is the whole upgrade protocol.
const MIGRATIONS: &[fn(&Connection) -> rusqlite::Result<()>] = &[add_tag_index];

/// The schema version this binary reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32 + 1;

/// Read the stored schema version. A missing or malformed value reads as 0,
/// which forces every migration to run.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: String = conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    Ok(raw.parse().unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [version.to_string()],
    )?;
    Ok(())
}

/// Apply every migration the stored version has not reached yet. Each step
/// is idempotent, so a crash between a migration and its version bump
/// re-runs it harmlessly on the next open.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let stored = get_schema_version(conn)?;
    if stored >= CURRENT_SCHEMA_VERSION {
        tracing::debug!(schema_version = stored, "schema up to date");
        return Ok(());
    }

    for (i, migrate) in MIGRATIONS.iter().enumerate() {
        let target = i as u32 + 2;
        if stored >= target {
            continue;
        }
        tracing::info!(to = target, "applying schema migration");
        migrate(conn)?;
        set_schema_version(conn, target)?;
    }
    Ok(())
}

/// v2: index memory_tags by tag so tag-filtered lookups and count repairs
/// stop scanning the whole junction table.
fn add_tag_index(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memory_tags_tag ON memory_tags(tag)",
        [],
    )?;
    Ok(())
}
