//! CLI `add-source` and `remove-source` commands.

use anyhow::Result;

use crate::catalog::error::CatalogError;
use crate::catalog::types::SourceType;
use crate::catalog::Catalog;
use crate::config::MemexConfig;

/// Register a directory as a source and, unless opted out, run its first scan.
pub fn add_source(
    config: &MemexConfig,
    path: &str,
    source_type: &str,
    no_scan: bool,
) -> Result<()> {
    let source_type: SourceType = source_type
        .parse()
        .map_err(CatalogError::InvalidArgument)?;

    let catalog = Catalog::open(config)?;
    let source = catalog.add_source(path, source_type)?;
    println!("Registered {} source {}", source.source_type, source.path);

    if no_scan || !config.ingest.scan_on_add {
        println!("Run `memex scan {}` to catalog it.", source.path);
        return Ok(());
    }

    crate::cli::scan::scan_one(&catalog, &source.path)
}

/// Remove a source and cascade over everything cataloged from it.
pub fn remove_source(config: &MemexConfig, path: &str, delete_files: bool) -> Result<()> {
    let catalog = Catalog::open(config)?;
    let report = catalog.remove_source(path, delete_files)?;

    println!("Removed source {path}");
    println!("  memories removed: {}", report.memories_removed);
    if delete_files {
        println!("  files deleted:    {}", report.files_deleted);
    }
    if !report.failures.is_empty() {
        println!("  failures:         {}", report.failures.len());
        for failure in &report.failures {
            println!("    {}: {}", failure.path, failure.reason);
        }
    }

    Ok(())
}
