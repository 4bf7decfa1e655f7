//! CLI `stats` command.

use anyhow::Result;

use crate::catalog::types::MemoryKind;
use crate::catalog::Catalog;
use crate::config::MemexConfig;

/// Display catalog statistics in the terminal.
pub fn stats(config: &MemexConfig) -> Result<()> {
    let catalog = Catalog::open(config)?;
    let stats = catalog.stats()?;

    println!("Catalog Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", stats.total_memories);
    println!("  Total file size:     {} bytes", stats.total_size_bytes);
    println!();

    println!("By Kind:");
    for kind in MemoryKind::ALL {
        let count = stats.by_kind.get(kind.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", kind.as_str(), count);
    }
    println!();

    println!("Sources:               {}", stats.total_sources);
    println!("Tags:                  {}", stats.total_tags);
    println!("Database size:         {} bytes", stats.db_size_bytes);

    if let Some(ref oldest) = stats.oldest_indexed {
        println!("Oldest indexed:        {oldest}");
    }
    if let Some(ref newest) = stats.newest_indexed {
        println!("Newest indexed:        {newest}");
    }

    Ok(())
}
