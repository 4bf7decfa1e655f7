//! The catalog engine: stores, tag bookkeeping, sources, and the assembled
//! [`Catalog`] state object the server and CLI operate on.

pub mod error;
pub mod sources;
pub mod stats;
pub mod store;
pub mod tags;
pub mod types;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::config::MemexConfig;
use crate::db;
use crate::ingest;
use crate::search::{self, SearchIndex};
use crate::thumbs::ThumbnailCache;

use self::error::CatalogError;
use self::stats::CatalogStats;
use self::types::{
    Memory, RemoveSourceReport, ScanReport, SearchQuery, SearchResults, Source, SourceType,
    TagCount,
};

/// Lock the shared connection, mapping poisoning to an internal error.
pub(crate) fn lock_db(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, CatalogError> {
    db.lock()
        .map_err(|e| CatalogError::Internal(anyhow::anyhow!("db lock poisoned: {e}")))
}

/// The assembled engine: shared database handle, derived search index, and
/// thumbnail cache. Cheap to clone; every clone shares the same state.
///
/// All methods are synchronous; async callers run them on a blocking
/// thread. Mutations update the index in the same call, so a query issued
/// after a mutation returns observes its effect.
#[derive(Clone)]
pub struct Catalog {
    db: Arc<Mutex<Connection>>,
    index: Arc<SearchIndex>,
    thumbs: Arc<ThumbnailCache>,
    db_path: Option<PathBuf>,
}

impl Catalog {
    /// Open (creating if needed) the database and thumbnail cache from
    /// configuration, and rebuild the search index from the stores.
    pub fn open(config: &MemexConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        let thumbs = ThumbnailCache::new(
            config.resolved_thumbnails_dir(),
            config.thumbnails.max_dim,
        )?;

        let index = SearchIndex::new();
        let indexed = index.rebuild(&conn)?;
        info!(memories = indexed, "search index rebuilt");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            index: Arc::new(index),
            thumbs: Arc::new(thumbs),
            db_path: Some(db_path),
        })
    }

    // ── Memories ──────────────────────────────────────────────────────────

    pub fn memory(&self, id: &str) -> Result<Memory, CatalogError> {
        let conn = lock_db(&self.db)?;
        store::get_memory(&conn, id)
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, CatalogError> {
        let conn = lock_db(&self.db)?;
        search::execute_query(&conn, &self.index, query)
    }

    /// Rebuild the derived index from the persisted stores. Returns the
    /// number of indexed memories.
    pub fn rebuild_index(&self) -> Result<usize, CatalogError> {
        let conn = lock_db(&self.db)?;
        self.index.rebuild(&conn)
    }

    // ── Tags ──────────────────────────────────────────────────────────────

    /// Add a tag to a memory and return the updated record. Idempotent.
    pub fn add_tag(&self, id: &str, tag: &str) -> Result<Memory, CatalogError> {
        let normalized = tags::normalize_tag(tag)?;
        let mut conn = lock_db(&self.db)?;
        let added = tags::add_tag(&mut conn, id, &normalized)?;
        if added {
            self.index.apply_tag(id, &normalized, true);
        }
        store::get_memory(&conn, id)
    }

    /// Remove a tag from a memory and return the updated record.
    pub fn remove_tag(&self, id: &str, tag: &str) -> Result<Memory, CatalogError> {
        let normalized = tags::normalize_tag(tag)?;
        let mut conn = lock_db(&self.db)?;
        tags::remove_tag(&mut conn, id, &normalized)?;
        self.index.apply_tag(id, &normalized, false);
        store::get_memory(&conn, id)
    }

    pub fn list_tags(&self) -> Result<Vec<TagCount>, CatalogError> {
        let conn = lock_db(&self.db)?;
        tags::list_tags(&conn)
    }

    // ── Sources ───────────────────────────────────────────────────────────

    /// Register a source root. The first scan is the caller's decision,
    /// so registration itself stays fast and synchronous.
    pub fn add_source(&self, path: &str, source_type: SourceType) -> Result<Source, CatalogError> {
        let conn = lock_db(&self.db)?;
        sources::add_source(&conn, path, source_type)
    }

    pub fn list_sources(&self) -> Result<Vec<Source>, CatalogError> {
        let conn = lock_db(&self.db)?;
        sources::list_sources(&conn)
    }

    /// Run an ingestion scan for a registered source.
    pub fn scan_source(&self, path: &str) -> Result<ScanReport, CatalogError> {
        let source = {
            let conn = lock_db(&self.db)?;
            sources::get_source(&conn, path)?
        };
        ingest::scan_source(&self.db, &self.index, &self.thumbs, &source)
    }

    /// Remove a source and cascade over everything it owns.
    pub fn remove_source(
        &self,
        path: &str,
        delete_files: bool,
    ) -> Result<RemoveSourceReport, CatalogError> {
        sources::remove_source(&self.db, &self.index, &self.thumbs, path, delete_files)
    }

    // ── Thumbnails ────────────────────────────────────────────────────────

    /// Cached preview bytes for an image memory.
    ///
    /// `NotFound` if the memory does not exist or its kind has no preview;
    /// `NotReady` if generation has not completed yet.
    pub fn get_thumbnail(&self, id: &str) -> Result<Vec<u8>, CatalogError> {
        let memory = self.memory(id)?;
        if memory.kind != types::MemoryKind::Image {
            return Err(CatalogError::NotFound(format!(
                "no thumbnail for {} memory {id}",
                memory.kind
            )));
        }
        match self.thumbs.read(&memory)? {
            Some(bytes) => Ok(bytes),
            None => Err(CatalogError::NotReady(format!(
                "thumbnail for {id} not generated yet"
            ))),
        }
    }

    // ── Stats ─────────────────────────────────────────────────────────────

    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = lock_db(&self.db)?;
        stats::catalog_stats(&conn, self.db_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::types::MemoryKind;
    use std::fs;
    use tempfile::TempDir;

    fn test_catalog(temp: &TempDir) -> Catalog {
        let mut config = MemexConfig::default();
        config.storage.db_path = temp
            .path()
            .join("index.db")
            .to_string_lossy()
            .into_owned();
        config.thumbnails.dir = temp.path().join("thumbs").to_string_lossy().into_owned();
        Catalog::open(&config).unwrap()
    }

    fn seeded_source(temp: &TempDir, catalog: &Catalog) -> String {
        let root = temp.path().join("files");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("beach_trip.md"), b"# beach trip notes").unwrap();
        fs::write(root.join("recipes.md"), b"# recipes").unwrap();
        let path = root.to_string_lossy().into_owned();
        catalog.add_source(&path, SourceType::Local).unwrap();
        catalog.scan_source(&path).unwrap();
        path
    }

    fn first_id(catalog: &Catalog, text: &str) -> String {
        let query = SearchQuery {
            text: Some(text.to_string()),
            ..SearchQuery::default()
        };
        catalog.search(&query).unwrap().memories[0].id.clone()
    }

    #[test]
    fn scan_then_search_end_to_end() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        seeded_source(&temp, &catalog);

        let results = catalog
            .search(&SearchQuery {
                text: Some("beach".to_string()),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(results.total_count, 1);
        assert_eq!(results.memories[0].title.as_deref(), Some("beach_trip"));
    }

    #[test]
    fn tag_mutations_are_visible_to_the_next_query() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        seeded_source(&temp, &catalog);
        let id = first_id(&catalog, "beach");

        let tagged = catalog.add_tag(&id, "  Vacation  ").unwrap();
        assert_eq!(tagged.tags, vec!["vacation"]);

        let query = SearchQuery {
            tags: types::TagFilter {
                include: vec!["vacation".to_string()],
                exclude: Vec::new(),
            },
            ..SearchQuery::default()
        };
        assert_eq!(catalog.search(&query).unwrap().total_count, 1);

        catalog.remove_tag(&id, "vacation").unwrap();
        assert_eq!(catalog.search(&query).unwrap().total_count, 0);
    }

    #[test]
    fn rebuilt_index_answers_queries_identically() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        seeded_source(&temp, &catalog);
        let id = first_id(&catalog, "recipes");
        catalog.add_tag(&id, "cooking").unwrap();

        let queries = [
            SearchQuery::default(),
            SearchQuery {
                text: Some("beach".to_string()),
                ..SearchQuery::default()
            },
            SearchQuery {
                tags: types::TagFilter {
                    include: vec!["cooking".to_string()],
                    exclude: Vec::new(),
                },
                ..SearchQuery::default()
            },
        ];
        let before: Vec<SearchResults> =
            queries.iter().map(|q| catalog.search(q).unwrap()).collect();

        catalog.rebuild_index().unwrap();

        for (query, expected) in queries.iter().zip(&before) {
            let after = catalog.search(query).unwrap();
            assert_eq!(after.total_count, expected.total_count);
            let ids = |r: &SearchResults| {
                r.memories.iter().map(|m| m.id.clone()).collect::<Vec<_>>()
            };
            assert_eq!(ids(&after), ids(expected));
            assert_eq!(after.suggested_tags, expected.suggested_tags);
        }
    }

    #[test]
    fn thumbnail_errors_distinguish_absent_from_pending() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        seeded_source(&temp, &catalog);
        let doc_id = first_id(&catalog, "beach");

        // unknown id
        let err = catalog.get_thumbnail("no-such-id").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        // a document has no preview at all
        let err = catalog.get_thumbnail(&doc_id).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn reopened_catalog_serves_the_same_records() {
        let temp = TempDir::new().unwrap();
        let source_path;
        {
            let catalog = test_catalog(&temp);
            source_path = seeded_source(&temp, &catalog);
            let id = first_id(&catalog, "beach");
            catalog.add_tag(&id, "vacation").unwrap();
        }

        let reopened = test_catalog(&temp);
        assert_eq!(reopened.list_sources().unwrap().len(), 1);
        assert_eq!(reopened.list_sources().unwrap()[0].path, source_path);

        let results = reopened
            .search(&SearchQuery {
                text: Some("beach".to_string()),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(results.total_count, 1);
        assert_eq!(results.memories[0].tags, vec!["vacation"]);
    }

    #[test]
    fn remove_source_purges_search_results() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        let path = seeded_source(&temp, &catalog);

        assert_eq!(catalog.search(&SearchQuery::default()).unwrap().total_count, 2);
        let report = catalog.remove_source(&path, false).unwrap();
        assert_eq!(report.memories_removed, 2);
        assert_eq!(catalog.search(&SearchQuery::default()).unwrap().total_count, 0);
        assert_eq!(catalog.stats().unwrap().total_memories, 0);
    }

    #[test]
    fn stats_track_the_catalog() {
        let temp = TempDir::new().unwrap();
        let catalog = test_catalog(&temp);
        seeded_source(&temp, &catalog);

        let stats = catalog.stats().unwrap();
        assert_eq!(stats.total_memories, 2);
        assert_eq!(stats.by_kind[MemoryKind::Document.as_str()], 2);
        assert_eq!(stats.total_sources, 1);
        assert!(stats.db_size_bytes > 0);
    }
}
