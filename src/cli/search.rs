//! CLI `search` command.

use anyhow::Result;

use crate::catalog::error::CatalogError;
use crate::catalog::types::{SearchQuery, TagFilter};
use crate::catalog::Catalog;
use crate::config::MemexConfig;

/// Raw search flags from the command line, not yet validated.
pub struct SearchOptions {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub exclude: Vec<String>,
    pub kind: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

/// Run a search from the terminal and print one page of results.
pub fn search(config: &MemexConfig, options: SearchOptions) -> Result<()> {
    let mut query = SearchQuery {
        text: options.query,
        tags: TagFilter {
            include: options.tags.iter().map(|t| t.trim().to_lowercase()).collect(),
            exclude: options.exclude.iter().map(|t| t.trim().to_lowercase()).collect(),
        },
        limit: config.effective_limit(options.limit),
        ..SearchQuery::default()
    };
    if let Some(raw) = options.kind.as_deref() {
        query.kind = Some(raw.parse().map_err(CatalogError::InvalidArgument)?);
    }
    if let Some(raw) = options.sort.as_deref() {
        query.sort = raw.parse().map_err(CatalogError::InvalidArgument)?;
    }

    let catalog = Catalog::open(config)?;
    let results = catalog.search(&query)?;

    if results.memories.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s), showing {}\n",
        results.total_count,
        results.memories.len()
    );

    for (i, memory) in results.memories.iter().enumerate() {
        let title = memory.title.as_deref().unwrap_or_else(|| memory.file_name());
        println!("  {}. [{}] {}", i + 1, memory.kind, title);
        println!("     {}", memory.path);
        if !memory.tags.is_empty() {
            println!("     tags: {}", memory.tags.join(", "));
        }
        println!();
    }

    if !results.suggested_tags.is_empty() {
        println!("Related tags: {}", results.suggested_tags.join(", "));
    }

    Ok(())
}
