//! HTTP server initialization.
//!
//! Provides the [`serve`] entry point that opens the catalog, builds the
//! search index, and runs the API router until ctrl-c.

use crate::api::{self, AppState};
use crate::catalog::Catalog;
use crate::config::MemexConfig;
use anyhow::Result;
use std::sync::Arc;

/// Start the HTTP API server.
pub async fn serve(config: MemexConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting memex server");

    let catalog = Catalog::open(&config)?;
    let state = AppState {
        catalog,
        config: Arc::new(config),
    };
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "memex listening at http://{bind_addr}/api");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down server");
        })
        .await?;

    Ok(())
}
