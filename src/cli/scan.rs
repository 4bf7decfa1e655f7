//! CLI `scan` command — rescan sources and print the report.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::catalog::Catalog;
use crate::config::MemexConfig;

/// Rescan one source, or every registered source when no path is given.
pub fn scan(config: &MemexConfig, path: Option<&str>) -> Result<()> {
    let catalog = Catalog::open(config)?;

    match path {
        Some(path) => scan_one(&catalog, path),
        None => {
            let sources = catalog.list_sources()?;
            if sources.is_empty() {
                println!("No sources registered.");
                return Ok(());
            }
            for source in &sources {
                scan_one(&catalog, &source.path)?;
            }
            Ok(())
        }
    }
}

/// Scan a single source behind a spinner, then print its report.
pub(crate) fn scan_one(catalog: &Catalog, path: &str) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} scanning {msg}")
            .expect("valid template"),
    );
    pb.set_message(path.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    // The walk runs to completion whatever the per-file outcomes; only a
    // missing source or a broken database aborts.
    let result = catalog.scan_source(path);
    pb.finish_and_clear();
    let report = result?;

    println!("Scanned {path}");
    println!("  added:     {}", report.added);
    println!("  updated:   {}", report.updated);
    println!("  unchanged: {}", report.unchanged);
    println!("  removed:   {}", report.removed);
    if report.failed() > 0 {
        println!("  failed:    {}", report.failed());
        for failure in &report.failures {
            println!("    {}: {}", failure.path, failure.reason);
        }
    }

    Ok(())
}
