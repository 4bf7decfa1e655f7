//! Disk-cached thumbnail previews.
//!
//! Each image memory gets one cached JPEG preview, capped to a configured
//! edge length and named by a hash of the source path so cache entries
//! survive re-ingestion and id churn. Generation failures are local: a
//! corrupt file yields a per-memory error and nothing else.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::catalog::error::CatalogError;
use crate::catalog::types::{Memory, MemoryKind};

/// Outcome of [`ThumbnailCache::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// A new preview was generated and written to the cache.
    Generated,
    /// A cached preview already existed; nothing was done.
    Cached,
}

/// Filesystem cache of generated previews.
pub struct ThumbnailCache {
    dir: PathBuf,
    max_dim: u32,
}

impl ThumbnailCache {
    pub fn new(dir: PathBuf, max_dim: u32) -> Result<Self, CatalogError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_dim })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for a source path. Hash-derived so the name is stable
    /// across rescans and safe regardless of what the path contains.
    pub fn cache_path(&self, source_path: &str) -> PathBuf {
        let digest = Sha256::digest(source_path.as_bytes());
        let mut name = String::with_capacity(36);
        for byte in &digest[..16] {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".jpg");
        self.dir.join(name)
    }

    /// Whether a preview has already been generated for this memory.
    pub fn is_ready(&self, memory: &Memory) -> bool {
        memory.kind == MemoryKind::Image && self.cache_path(&memory.path).exists()
    }

    /// Generate the preview if it is not cached yet. Idempotent.
    ///
    /// Only image memories have previews; any other kind is reported as a
    /// per-memory thumbnail failure rather than a hard error.
    pub fn ensure(&self, memory: &Memory) -> Result<ThumbnailOutcome, CatalogError> {
        if memory.kind != MemoryKind::Image {
            return Err(CatalogError::Thumbnail {
                path: memory.path.clone(),
                reason: format!("unsupported kind: {}", memory.kind),
            });
        }

        let target = self.cache_path(&memory.path);
        if target.exists() {
            return Ok(ThumbnailOutcome::Cached);
        }

        debug!(path = %memory.path, "generating thumbnail");
        let img = image::open(&memory.path).map_err(|e| CatalogError::Thumbnail {
            path: memory.path.clone(),
            reason: e.to_string(),
        })?;

        // Bounded to max_dim on the longer edge, aspect ratio preserved.
        // JPEG has no alpha channel, so flatten to RGB before encoding.
        let preview = img.thumbnail(self.max_dim, self.max_dim).into_rgb8();

        // Write to a sibling temp file and rename, so a crash mid-write
        // never leaves a truncated preview that `exists()` would trust.
        let tmp = target.with_extension("jpg.tmp");
        preview
            .save_with_format(&tmp, ImageFormat::Jpeg)
            .map_err(|e| CatalogError::Thumbnail {
                path: memory.path.clone(),
                reason: e.to_string(),
            })?;
        fs::rename(&tmp, &target)?;

        Ok(ThumbnailOutcome::Generated)
    }

    /// Read the cached preview bytes, or `None` if not generated yet.
    pub fn read(&self, memory: &Memory) -> Result<Option<Vec<u8>>, CatalogError> {
        match fs::read(self.cache_path(&memory.path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the cached preview for a source path, if any. Best effort:
    /// a stale cache entry is harmless, so removal failures only warn.
    pub fn remove(&self, source_path: &str) {
        let target = self.cache_path(source_path);
        if let Err(e) = fs::remove_file(&target) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %target.display(), error = %e, "failed to remove thumbnail");
            }
        }
    }
}
