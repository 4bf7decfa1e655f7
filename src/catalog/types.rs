//! Core catalog type definitions.
//!
//! Defines [`MemoryKind`] (file classification), [`Memory`] (a cataloged
//! file), [`Source`] (a registered root), the structured query types, and the
//! report structs returned by scans and cascades.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a cataloged file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Image,
    Video,
    Audio,
    Code,
    Document,
    Other,
}

impl MemoryKind {
    /// All kinds, in stats display order.
    pub const ALL: [MemoryKind; 6] = [
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Code,
        Self::Document,
        Self::Other,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Code => "code",
            Self::Document => "document",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "code" => Ok(Self::Code),
            "document" => Ok(Self::Document),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown memory kind: {s}")),
        }
    }
}

/// Kind of a registered source root. Only local filesystem roots exist
/// today; the enum leaves room for remote kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Local,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown source type: {s}")),
        }
    }
}

/// Result ordering for a search query. Every variant is a total order with
/// the memory id as tie-break, so pagination stays stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Text-match strength plus recency. Falls back to `DateNewest` when the
    /// query has no text.
    Relevance,
    DateNewest,
    DateOldest,
    NameAsc,
    NameDesc,
    SizeAsc,
    SizeDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::DateNewest => "date_newest",
            Self::DateOldest => "date_oldest",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::SizeAsc => "size_asc",
            Self::SizeDesc => "size_desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "date_newest" => Ok(Self::DateNewest),
            "date_oldest" => Ok(Self::DateOldest),
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "size_asc" => Ok(Self::SizeAsc),
            "size_desc" => Ok(Self::SizeDesc),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// A cataloged file, matching the `memories` table schema plus its tag set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key. Immutable once assigned.
    pub id: String,
    /// Absolute file path. Unique across the catalog.
    pub path: String,
    /// Path of the source root that owns this memory.
    pub source_path: String,
    /// File classification derived from the extension.
    pub kind: MemoryKind,
    /// File size in bytes at the last scan.
    pub size_bytes: i64,
    /// Display title. Currently the file stem, set at ingest.
    pub title: Option<String>,
    /// Free-text description. Reserved for metadata extractors.
    pub description: Option<String>,
    /// Detected language name for code files.
    pub language: Option<String>,
    /// Filesystem modification timestamp at the last scan.
    pub modified_at: DateTime<Utc>,
    /// When this memory was last (re)ingested.
    pub indexed_at: DateTime<Utc>,
    /// Normalized tag names, sorted, no duplicates.
    pub tags: Vec<String>,
}

impl Memory {
    /// The file name component of the path, used for name sorts and scoring.
    pub fn file_name(&self) -> &str {
        std::path::Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }
}

/// A registered source root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Root path. Primary key of the source registry.
    pub path: String,
    pub source_type: SourceType,
    /// When this source was registered.
    pub added_at: DateTime<Utc>,
}

/// A tag name with its current usage count.
#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Structured tag filter. The `-tag` exclusion prefix is a boundary-layer
/// convention; by the time a query reaches the engine it has been split into
/// these two sets. Matching is conjunctive: every include must be present
/// and every exclude absent.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TagFilter {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// A fully validated search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Case-insensitive text to match against indexed names, titles,
    /// descriptions, and tag names. `None` matches everything.
    pub text: Option<String>,
    pub tags: TagFilter,
    /// Restrict results to one kind. `None` matches all kinds.
    pub kind: Option<MemoryKind>,
    pub sort: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            tags: TagFilter::default(),
            kind: None,
            sort: SortOrder::Relevance,
            limit: 50,
            offset: 0,
        }
    }
}

/// One page of search results.
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub memories: Vec<Memory>,
    /// Count of all matches before pagination, not the page length.
    pub total_count: usize,
    /// Tags co-occurring with the match set, excluding filter tags.
    pub suggested_tags: Vec<String>,
}

/// A per-file failure recorded during a scan or cascade.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome counts for one ingestion scan of a source.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Outcome of a source removal cascade.
#[derive(Debug, Default, Serialize)]
pub struct RemoveSourceReport {
    pub memories_removed: usize,
    pub files_deleted: usize,
    pub failures: Vec<ScanFailure>,
}
