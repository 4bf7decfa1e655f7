//! Derived search index and query execution.
//!
//! [`SearchIndex`] is an in-memory inverted view over the memory and tag
//! stores: one entry per memory with its lowercased searchable text, tag
//! set, kind, and sortable fields. It is never the source of truth — it is
//! maintained incrementally on every upsert, removal, and tag delta, and
//! [`SearchIndex::rebuild`] reconstructs an observably equivalent index from
//! the database at any time.
//!
//! [`execute_query`] runs the full pipeline: filter → rank → paginate →
//! suggest tags → hydrate rows from the store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::catalog::error::CatalogError;
use crate::catalog::store;
use crate::catalog::types::{Memory, MemoryKind, SearchQuery, SearchResults, SortOrder};

/// How many co-occurring tags a query suggests at most.
const MAX_SUGGESTED_TAGS: usize = 10;

// ── Index structure ───────────────────────────────────────────────────────────

/// One memory's searchable projection.
#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    /// Lowercased file name, used for matching and name sorts.
    name: String,
    title: Option<String>,
    description: Option<String>,
    tags: BTreeSet<String>,
    kind: MemoryKind,
    size_bytes: i64,
    modified_at: DateTime<Utc>,
    indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    fn from_memory(memory: &Memory) -> Self {
        Self {
            id: memory.id.clone(),
            name: memory.file_name().to_lowercase(),
            title: memory.title.as_ref().map(|t| t.to_lowercase()),
            description: memory.description.as_ref().map(|d| d.to_lowercase()),
            tags: memory.tags.iter().cloned().collect(),
            kind: memory.kind,
            size_bytes: memory.size_bytes,
            modified_at: memory.modified_at,
            indexed_at: memory.indexed_at,
        }
    }

    /// Case-insensitive text match over name, title, description, and tags.
    fn matches_text(&self, needle: &str) -> bool {
        self.name.contains(needle)
            || self.title.as_deref().is_some_and(|t| t.contains(needle))
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.contains(needle))
            || self.tags.iter().any(|t| t.contains(needle))
    }
}

/// The queryable derived index. Reads and writes go through one
/// reader-writer lock; queries take the read side, so they are only ever
/// blocked for the duration of a single entry update.
pub struct SearchIndex {
    entries: RwLock<HashMap<String, IndexEntry>>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // The index is rebuildable derived data: a panic mid-update cannot leave
    // an entry torn (whole-value inserts), so a poisoned lock is recovered
    // rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, IndexEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, IndexEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the whole index from the persisted stores. Returns the entry
    /// count. The result is observably equivalent to an index maintained
    /// purely incrementally.
    pub fn rebuild(&self, conn: &Connection) -> Result<usize, CatalogError> {
        let memories = store::list_all_memories(conn)?;
        let fresh: HashMap<String, IndexEntry> = memories
            .iter()
            .map(|m| (m.id.clone(), IndexEntry::from_memory(m)))
            .collect();
        let count = fresh.len();
        *self.write() = fresh;
        Ok(count)
    }

    /// Add or refresh one memory's entry. The entry's tag set is taken from
    /// the memory, so callers pass records with tags loaded.
    pub fn upsert(&self, memory: &Memory) {
        self.write()
            .insert(memory.id.clone(), IndexEntry::from_memory(memory));
    }

    /// Drop one memory's entry. Callers invoke this before the store
    /// removal commits so the index never serves an id the store lacks.
    pub fn remove(&self, id: &str) {
        self.write().remove(id);
    }

    /// Apply a single tag delta without touching the rest of the entry.
    pub fn apply_tag(&self, id: &str, tag: &str, added: bool) {
        let mut entries = self.write();
        if let Some(entry) = entries.get_mut(id) {
            if added {
                entry.tags.insert(tag.to_string());
            } else {
                entry.tags.remove(tag);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Rank all matching entries and slice out one page of ids.
    ///
    /// `total_count` counts every match before pagination; suggested tags
    /// are computed over the full match set, not the page.
    pub fn select(&self, query: &SearchQuery) -> RankedPage {
        let now = Utc::now();
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let entries = self.read();

        // 1. Filter: text, kind, include/exclude tags (conjunctive)
        let mut matches: Vec<&IndexEntry> = entries
            .values()
            .filter(|e| {
                if let Some(kind) = query.kind {
                    if e.kind != kind {
                        return false;
                    }
                }
                if !query.tags.include.iter().all(|t| e.tags.contains(t)) {
                    return false;
                }
                if query.tags.exclude.iter().any(|t| e.tags.contains(t)) {
                    return false;
                }
                if let Some(ref needle) = needle {
                    if !e.matches_text(needle) {
                        return false;
                    }
                }
                true
            })
            .collect();

        // 2. Order: every sort is a total order with id as tie-break
        sort_matches(&mut matches, query.sort, needle.as_deref(), now);

        // 3. Suggested tags from the whole match set
        let suggested_tags = suggest_tags(&matches, query, needle.as_deref());

        // 4. Page slice
        let total_count = matches.len();
        let page_ids: Vec<String> = matches
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|e| e.id.clone())
            .collect();

        RankedPage {
            page_ids,
            total_count,
            suggested_tags,
        }
    }
}

/// Output of [`SearchIndex::select`]: ordered page ids plus query-wide
/// aggregates.
#[derive(Debug)]
pub struct RankedPage {
    pub page_ids: Vec<String>,
    pub total_count: usize,
    pub suggested_tags: Vec<String>,
}

/// Full query pipeline: rank ids against the index, then hydrate the page
/// from the memory store. Ids removed between ranking and hydration simply
/// drop out of the page.
pub fn execute_query(
    conn: &Connection,
    index: &SearchIndex,
    query: &SearchQuery,
) -> Result<SearchResults, CatalogError> {
    let ranked = index.select(query);
    let memories = store::fetch_memories(conn, &ranked.page_ids)?;

    Ok(SearchResults {
        memories,
        total_count: ranked.total_count,
        suggested_tags: ranked.suggested_tags,
    })
}

// ── Ranking ───────────────────────────────────────────────────────────────────

fn sort_matches(
    matches: &mut [&IndexEntry],
    sort: SortOrder,
    needle: Option<&str>,
    now: DateTime<Utc>,
) {
    match sort {
        SortOrder::Relevance => match needle {
            Some(needle) => {
                matches.sort_by(|a, b| {
                    relevance_score(b, needle, now)
                        .total_cmp(&relevance_score(a, needle, now))
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            // No text to score against: fall back to newest-first
            None => sort_matches(matches, SortOrder::DateNewest, None, now),
        },
        SortOrder::DateNewest => {
            matches.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then_with(|| a.id.cmp(&b.id)));
        }
        SortOrder::DateOldest => {
            matches.sort_by(|a, b| a.modified_at.cmp(&b.modified_at).then_with(|| a.id.cmp(&b.id)));
        }
        SortOrder::NameAsc => {
            matches.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        }
        SortOrder::NameDesc => {
            matches.sort_by(|a, b| b.name.cmp(&a.name).then_with(|| a.id.cmp(&b.id)));
        }
        SortOrder::SizeAsc => {
            matches.sort_by(|a, b| a.size_bytes.cmp(&b.size_bytes).then_with(|| a.id.cmp(&b.id)));
        }
        SortOrder::SizeDesc => {
            matches.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.id.cmp(&b.id)));
        }
    }
}

/// Deterministic text-match score with a recency boost.
///
/// Weights: name contains 8 (+4 if the name starts with the query), title
/// contains 10 (+5 for prefix), any tag contains 7, description contains 3.
/// Recently indexed entries get a multiplier: 1.1 within 7 days, 1.05
/// within 30.
fn relevance_score(entry: &IndexEntry, needle: &str, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if entry.name.contains(needle) {
        score += 8.0;
        if entry.name.starts_with(needle) {
            score += 4.0;
        }
    }
    if let Some(title) = entry.title.as_deref() {
        if title.contains(needle) {
            score += 10.0;
            if title.starts_with(needle) {
                score += 5.0;
            }
        }
    }
    if entry.tags.iter().any(|t| t.contains(needle)) {
        score += 7.0;
    }
    if let Some(description) = entry.description.as_deref() {
        if description.contains(needle) {
            score += 3.0;
        }
    }

    let age = now.signed_duration_since(entry.indexed_at);
    if age < chrono::Duration::days(7) {
        score *= 1.1;
    } else if age < chrono::Duration::days(30) {
        score *= 1.05;
    }

    score
}

// ── Tag suggestions ───────────────────────────────────────────────────────────

/// Tags co-occurring with the match set, minus the tags already used as
/// filters. With query text, candidates are scored against it (exact 100,
/// prefix 80, substring 50, whole-query-word 40) plus a log-scaled
/// co-occurrence bonus; without text, raw co-occurrence decides.
fn suggest_tags(matches: &[&IndexEntry], query: &SearchQuery, needle: Option<&str>) -> Vec<String> {
    let mut co_occurrence: HashMap<&str, usize> = HashMap::new();
    for entry in matches {
        for tag in &entry.tags {
            *co_occurrence.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    for used in query.tags.include.iter().chain(&query.tags.exclude) {
        co_occurrence.remove(used.as_str());
    }

    let mut scored: Vec<(f64, &str)> = co_occurrence
        .into_iter()
        .map(|(tag, count)| {
            let base = match needle {
                Some(needle) => tag_match_score(tag, needle),
                None => 0.0,
            };
            (base + (1.0 + count as f64).ln(), tag)
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTED_TAGS)
        .map(|(_, tag)| tag.to_string())
        .collect()
}

fn tag_match_score(tag: &str, needle: &str) -> f64 {
    if tag == needle {
        100.0
    } else if tag.starts_with(needle) {
        80.0
    } else if tag.contains(needle) {
        50.0
    } else if needle.split_whitespace().any(|word| word == tag) {
        40.0
    } else {
        0.0
    }
}
