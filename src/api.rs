//! HTTP surface over the catalog engine.
//!
//! This layer owns boundary concerns only: strict parsing of query and
//! body parameters (unrecognized kind/sort values are rejected, never
//! defaulted), the `-tag` exclusion convention, and status-code mapping.
//! Every engine call runs on a blocking thread so the async executor is
//! never stalled by SQLite or image work.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::catalog::error::CatalogError;
use crate::catalog::stats::CatalogStats;
use crate::catalog::types::{
    Memory, RemoveSourceReport, SearchQuery, SearchResults, Source, SourceType, TagCount,
    TagFilter,
};
use crate::catalog::Catalog;
use crate::config::MemexConfig;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub config: Arc<MemexConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/search", get(search))
        .route("/api/memories/{id}", get(get_memory))
        .route("/api/thumbnails/{id}", get(get_thumbnail))
        .route("/api/sources", get(list_sources).post(add_source))
        .route("/api/sources/{*path}", delete(remove_source))
        .route("/api/tags", get(list_tags))
        .route("/api/memories/{id}/tags", post(add_tag))
        .route("/api/memories/{id}/tags/{tag}", delete(remove_tag))
        .with_state(state)
}

/// Run a sync engine call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("engine task failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn stats(State(state): State<AppState>) -> Result<Json<CatalogStats>, ApiError> {
    let catalog = state.catalog.clone();
    let stats = run_blocking(move || catalog.stats()).await?;
    Ok(Json(stats))
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let query = params.into_query(&state.config)?;
    let catalog = state.catalog.clone();
    let results = run_blocking(move || catalog.search(&query)).await?;
    Ok(Json(results))
}

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Memory>, ApiError> {
    let catalog = state.catalog.clone();
    let memory = run_blocking(move || catalog.memory(&id)).await?;
    Ok(Json(memory))
}

async fn get_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let catalog = state.catalog.clone();
    let bytes = run_blocking(move || catalog.get_thumbnail(&id)).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>, ApiError> {
    let catalog = state.catalog.clone();
    let sources = run_blocking(move || catalog.list_sources()).await?;
    Ok(Json(sources))
}

async fn add_source(
    State(state): State<AppState>,
    Json(payload): Json<AddSourceRequest>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let source_type: SourceType = payload
        .source_type
        .parse()
        .map_err(CatalogError::InvalidArgument)?;

    let catalog = state.catalog.clone();
    let path = payload.path.clone();
    let source = run_blocking(move || catalog.add_source(&path, source_type)).await?;

    // Registration is reported before the first scan runs; the scan is
    // kicked off in the background so the request never waits on a walk.
    if state.config.ingest.scan_on_add {
        spawn_initial_scan(state.catalog.clone(), source.path.clone());
    }

    Ok((StatusCode::CREATED, Json(source)))
}

fn spawn_initial_scan(catalog: Catalog, path: String) {
    tokio::spawn(async move {
        let log_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || catalog.scan_source(&path)).await;
        match outcome {
            Ok(Ok(report)) => info!(
                source = %log_path,
                added = report.added,
                updated = report.updated,
                removed = report.removed,
                failed = report.failed(),
                "initial scan finished"
            ),
            Ok(Err(e)) => warn!(source = %log_path, error = %e, "initial scan failed"),
            Err(e) => warn!(source = %log_path, error = %e, "initial scan task failed"),
        }
    });
}

async fn remove_source(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<RemoveSourceParams>,
) -> Result<Json<RemoveSourceReport>, ApiError> {
    // The route wildcard eats the leading slash of an absolute path.
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };

    let delete_files = params.delete_files.unwrap_or(false);
    let catalog = state.catalog.clone();
    let report = run_blocking(move || catalog.remove_source(&path, delete_files)).await?;
    Ok(Json(report))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagCount>>, ApiError> {
    let catalog = state.catalog.clone();
    let tags = run_blocking(move || catalog.list_tags()).await?;
    Ok(Json(tags))
}

async fn add_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddTagRequest>,
) -> Result<Json<Memory>, ApiError> {
    let catalog = state.catalog.clone();
    let memory = run_blocking(move || catalog.add_tag(&id, &payload.tag)).await?;
    Ok(Json(memory))
}

async fn remove_tag(
    State(state): State<AppState>,
    Path((id, tag)): Path<(String, String)>,
) -> Result<Json<Memory>, ApiError> {
    let catalog = state.catalog.clone();
    let memory = run_blocking(move || catalog.remove_tag(&id, &tag)).await?;
    Ok(Json(memory))
}

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    /// Comma-separated tags; a `-` prefix excludes.
    tags: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    sort: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SearchParams {
    /// Validate into the engine's structured query. Unknown kind or sort
    /// values are rejected rather than silently defaulted.
    fn into_query(self, config: &MemexConfig) -> Result<SearchQuery, ApiError> {
        let mut query = SearchQuery {
            text: self.q,
            limit: config.effective_limit(self.limit),
            offset: self.offset.unwrap_or(0),
            ..SearchQuery::default()
        };

        if let Some(raw) = self.tags.as_deref() {
            query.tags = parse_tag_filter(raw);
        }
        if let Some(raw) = self.kind.as_deref() {
            query.kind = Some(raw.parse().map_err(CatalogError::InvalidArgument)?);
        }
        if let Some(raw) = self.sort.as_deref() {
            query.sort = raw.parse().map_err(CatalogError::InvalidArgument)?;
        }

        Ok(query)
    }
}

/// Split the wire-format tag list into the structured filter the engine
/// takes. The `-` prefix convention exists only here.
fn parse_tag_filter(raw: &str) -> TagFilter {
    let mut filter = TagFilter::default();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('-') {
            Some(excluded) if !excluded.is_empty() => {
                filter.exclude.push(excluded.to_lowercase());
            }
            Some(_) => {}
            None => filter.include.push(part.to_lowercase()),
        }
    }
    filter
}

#[derive(Debug, Deserialize)]
struct AddSourceRequest {
    #[serde(rename = "sourceType")]
    source_type: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct RemoveSourceParams {
    #[serde(rename = "deleteFiles")]
    delete_files: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AddTagRequest {
    tag: String,
}

// ── Error mapping ─────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ApiError {
    Catalog(CatalogError),
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Catalog(err) => {
                let status = match &err {
                    CatalogError::NotFound(_) | CatalogError::TagNotPresent { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    CatalogError::Conflict(_) => StatusCode::CONFLICT,
                    CatalogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    CatalogError::NotReady(_) => StatusCode::ACCEPTED,
                    _ => {
                        error!(error = %err, "internal error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.label(), err.to_string())
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
            "code": code,
        }));
        (status, body).into_response()
    }
}
