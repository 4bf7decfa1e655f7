pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open the catalog database at `path`, creating file and parent directories
/// as needed, and bring the schema up to the current version.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("could not open catalog database {}", path.display()))?;
    configure_connection(&conn)?;
    prepare_schema(&conn)?;

    tracing::info!(path = %path.display(), "catalog database ready");
    Ok(conn)
}

/// In-memory database with the full schema, for unit tests.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("could not open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    prepare_schema(&conn)?;
    Ok(conn)
}

// WAL keeps readers unblocked during scans; the busy timeout covers the
// short write bursts when another connection (backup tools, sqlite3 shell)
// has the file open.
fn configure_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

fn prepare_schema(conn: &Connection) -> Result<()> {
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}
