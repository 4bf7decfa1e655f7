//! Typed error taxonomy for the catalog engine.
//!
//! Engine functions return [`CatalogError`] so callers can distinguish
//! entity-identity failures (absent memory, duplicate source) from per-file
//! failures and infrastructure errors. The HTTP layer maps each variant to a
//! status code; the CLI prints the message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested memory, source, or thumbnail subject does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated (duplicate source path, or a memory
    /// path already owned by a different id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Tag removal was requested for a memory that does not carry the tag.
    #[error("tag '{tag}' not present on memory {memory_id}")]
    TagNotPresent { memory_id: String, tag: String },

    /// An enum-valued request field (kind, sort, source type) did not parse.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Thumbnail requested before generation completed for an eligible memory.
    #[error("thumbnail not ready for memory {0}")]
    NotReady(String),

    /// A single file failed to ingest. Collected into the scan report,
    /// never aborts the scan.
    #[error("ingestion failed for {path}: {reason}")]
    Ingestion { path: String, reason: String },

    /// A single thumbnail failed to generate. Collected, never fatal.
    #[error("thumbnail generation failed for {path}: {reason}")]
    Thumbnail { path: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    /// Short machine-readable label, used in scan failure records and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::TagNotPresent { .. } => "tag_not_present",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotReady(_) => "not_ready",
            Self::Ingestion { .. } => "ingestion_failure",
            Self::Thumbnail { .. } => "thumbnail_failure",
            Self::Database(_) => "database_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
