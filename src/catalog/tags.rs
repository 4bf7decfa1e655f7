//! Tag store — named labels on memories with denormalized usage counts.
//!
//! Tag names are normalized (trimmed, ASCII-lowercased) before any lookup
//! or write. Adding is idempotent; removing a tag the memory does not carry
//! is a distinct error from the memory itself being absent. A tag row whose
//! count reaches zero is deleted, so [`list_tags`] never reports unused tags.

use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::error::CatalogError;
use crate::catalog::types::TagCount;

/// Canonical form of a tag name.
pub fn normalize_tag(raw: &str) -> Result<String, CatalogError> {
    let tag = raw.trim().to_ascii_lowercase();
    if tag.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "tag name must not be empty".to_string(),
        ));
    }
    Ok(tag)
}

/// Attach a tag to a memory. Returns `true` if the tag was newly added,
/// `false` if the memory already carried it (no double-count).
pub fn add_tag(conn: &mut Connection, memory_id: &str, tag: &str) -> Result<bool, CatalogError> {
    let tag = normalize_tag(tag)?;
    let tx = conn.transaction()?;

    ensure_memory_exists(&tx, memory_id)?;

    let inserted = tx.execute(
        "INSERT OR IGNORE INTO memory_tags (memory_id, tag) VALUES (?1, ?2)",
        params![memory_id, tag],
    )?;

    if inserted == 1 {
        tx.execute(
            "INSERT INTO tags (name, count) VALUES (?1, 1) \
             ON CONFLICT(name) DO UPDATE SET count = count + 1",
            params![tag],
        )?;
    }

    tx.commit()?;
    Ok(inserted == 1)
}

/// Detach a tag from a memory, dropping the tag row if its count hits zero.
///
/// Fails [`CatalogError::NotFound`] when the memory is absent and
/// [`CatalogError::TagNotPresent`] when the memory exists but does not carry
/// the tag, so callers can report the two cases accurately.
pub fn remove_tag(conn: &mut Connection, memory_id: &str, tag: &str) -> Result<(), CatalogError> {
    let tag = normalize_tag(tag)?;
    let tx = conn.transaction()?;

    ensure_memory_exists(&tx, memory_id)?;

    let removed = tx.execute(
        "DELETE FROM memory_tags WHERE memory_id = ?1 AND tag = ?2",
        params![memory_id, tag],
    )?;
    if removed == 0 {
        return Err(CatalogError::TagNotPresent {
            memory_id: memory_id.to_string(),
            tag,
        });
    }

    tx.execute(
        "UPDATE tags SET count = count - 1 WHERE name = ?1",
        params![tag],
    )?;
    tx.execute(
        "DELETE FROM tags WHERE name = ?1 AND count <= 0",
        params![tag],
    )?;

    tx.commit()?;
    Ok(())
}

/// All tags with their current counts, most used first. A single SELECT, so
/// counts are a consistent snapshot.
pub fn list_tags(conn: &Connection) -> Result<Vec<TagCount>, CatalogError> {
    let mut stmt = conn.prepare("SELECT name, count FROM tags ORDER BY count DESC, name ASC")?;
    let tags: Vec<TagCount> = stmt
        .query_map([], |row| {
            Ok(TagCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn ensure_memory_exists(conn: &Connection, memory_id: &str) -> Result<(), CatalogError> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM memories WHERE id = ?1",
            params![memory_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(CatalogError::NotFound(format!("memory {memory_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store;
    use crate::catalog::types::{Memory, MemoryKind};
    use crate::db;
    use chrono::Utc;

    fn test_db() -> Connection {
        let mut conn = db::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO sources (path, source_type, added_at) VALUES ('/photos', 'local', ?1)",
            params![Utc::now().to_rfc3339()],
        )
        .unwrap();
        store::upsert_memory(
            &mut conn,
            &Memory {
                id: "m1".to_string(),
                path: "/photos/a.jpg".to_string(),
                source_path: "/photos".to_string(),
                kind: MemoryKind::Image,
                size_bytes: 10,
                title: None,
                description: None,
                language: None,
                modified_at: Utc::now(),
                indexed_at: Utc::now(),
                tags: Vec::new(),
            },
        )
        .unwrap();
        conn
    }

    fn count_of(conn: &Connection, tag: &str) -> Option<i64> {
        conn.query_row(
            "SELECT count FROM tags WHERE name = ?1",
            params![tag],
            |row| row.get(0),
        )
        .optional()
        .unwrap()
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut conn = test_db();

        assert!(add_tag(&mut conn, "m1", "fav").unwrap());
        assert!(!add_tag(&mut conn, "m1", "fav").unwrap());

        assert_eq!(count_of(&conn, "fav"), Some(1));
    }

    #[test]
    fn add_tag_normalizes_name() {
        let mut conn = test_db();

        assert!(add_tag(&mut conn, "m1", "  FaV ").unwrap());
        // The normalized form collides with the already-present tag
        assert!(!add_tag(&mut conn, "m1", "fav").unwrap());

        let listed = list_tags(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "fav");
    }

    #[test]
    fn add_tag_on_missing_memory_is_not_found() {
        let mut conn = test_db();
        let err = add_tag(&mut conn, "ghost", "fav").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn empty_tag_is_rejected() {
        let mut conn = test_db();
        let err = add_tag(&mut conn, "m1", "   ").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument(_)));
    }

    #[test]
    fn remove_tag_distinguishes_absent_tag_from_absent_memory() {
        let mut conn = test_db();
        add_tag(&mut conn, "m1", "fav").unwrap();

        let err = remove_tag(&mut conn, "m1", "other").unwrap_err();
        assert!(matches!(err, CatalogError::TagNotPresent { .. }));

        let err = remove_tag(&mut conn, "ghost", "fav").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn remove_last_reference_deletes_tag_row() {
        let mut conn = test_db();
        add_tag(&mut conn, "m1", "fav").unwrap();

        remove_tag(&mut conn, "m1", "fav").unwrap();

        assert_eq!(count_of(&conn, "fav"), None);
        assert!(list_tags(&conn).unwrap().is_empty());
    }

    #[test]
    fn net_tag_set_matches_replayed_operations() {
        let mut conn = test_db();

        // add, re-add, remove, add again — net result is one tag with count 1
        add_tag(&mut conn, "m1", "fav").unwrap();
        add_tag(&mut conn, "m1", "fav").unwrap();
        remove_tag(&mut conn, "m1", "fav").unwrap();
        add_tag(&mut conn, "m1", "fav").unwrap();
        add_tag(&mut conn, "m1", "beach").unwrap();
        remove_tag(&mut conn, "m1", "beach").unwrap();

        let got = store::tags_for_memory(&conn, "m1").unwrap();
        assert_eq!(got, vec!["fav"]);
        assert_eq!(count_of(&conn, "fav"), Some(1));
        assert_eq!(count_of(&conn, "beach"), None);
    }

    #[test]
    fn list_tags_orders_by_count_then_name() {
        let mut conn = test_db();
        store::upsert_memory(
            &mut conn,
            &Memory {
                id: "m2".to_string(),
                path: "/photos/b.jpg".to_string(),
                source_path: "/photos".to_string(),
                kind: MemoryKind::Image,
                size_bytes: 10,
                title: None,
                description: None,
                language: None,
                modified_at: Utc::now(),
                indexed_at: Utc::now(),
                tags: Vec::new(),
            },
        )
        .unwrap();

        add_tag(&mut conn, "m1", "beach").unwrap();
        add_tag(&mut conn, "m2", "beach").unwrap();
        add_tag(&mut conn, "m1", "alps").unwrap();
        add_tag(&mut conn, "m1", "fav").unwrap();

        let listed = list_tags(&conn).unwrap();
        let names: Vec<&str> = listed.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["beach", "alps", "fav"]);
        assert_eq!(listed[0].count, 2);
    }
}
