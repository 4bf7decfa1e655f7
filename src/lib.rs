//! Local memory index — catalog, tag, and search the files you keep.
//!
//! Memex scans configured source directories and builds a searchable catalog
//! of the files under them. Every cataloged file is a `Memory` record,
//! classified by kind from its extension:
//!
//! | Kind | Typical extensions |
//! |------|--------------------|
//! | **Image** | jpg, png, gif, webp, heic |
//! | **Video** | mp4, mov, mkv, webm |
//! | **Audio** | mp3, wav, flac, ogg |
//! | **Document** | pdf, docx, txt, md, xlsx |
//! | **Code** | rs, py, js, go, c (language recorded) |
//! | **Other** | zip, tar, gz |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (bundled, WAL mode) holding memories, tags, and sources
//! - **Search**: in-memory index rebuilt from the store at startup and kept in
//!   sync by every mutation, with deterministic relevance ranking
//! - **Thumbnails**: JPEG previews for images via the `image` crate, cached
//!   on disk keyed by a hash of the source path
//! - **Transport**: HTTP JSON API over axum
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with env-var overrides and defaults
//! - [`db`] — SQLite database initialization and schema
//! - [`catalog`] — Core engine: memory store, tags, sources, and the [`catalog::Catalog`] handle
//! - [`ingest`] — Directory walking, kind classification, and scan/tombstone logic
//! - [`search`] — The in-memory search index and query execution
//! - [`thumbs`] — Thumbnail generation and cache

pub mod catalog;
pub mod config;
pub mod db;
pub mod ingest;
pub mod search;
pub mod thumbs;
