use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use booksearch_core::{Error, ScoredDoc, SearchEngine, SearchMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ScoredDoc>,
}

#[derive(Serialize)]
pub struct IndexSummary {
    pub docs: usize,
    pub terms: usize,
    pub index_path: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub index_path: PathBuf,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn load(index_path: impl Into<PathBuf>, admin_token: Option<String>) -> Result<Self> {
        let index_path = index_path.into();
        let engine = SearchEngine::load(&index_path)?;
        tracing::info!(path = %index_path.display(), docs = engine.num_docs(), terms = engine.num_terms(), "index loaded");
        Ok(Self { engine: Arc::new(engine), index_path, admin_token })
    }

    /// Reload the snapshot off the async runtime. On failure the previous
    /// snapshot stays in service.
    pub async fn reload(&self) -> Result<(), Error> {
        let engine = Arc::clone(&self.engine);
        let path = self.index_path.clone();
        match tokio::task::spawn_blocking(move || engine.reload(&path)).await {
            Ok(res) => res,
            Err(join) => Err(Error::Io(std::io::Error::other(join))),
        }
    }

    fn summary(&self) -> IndexSummary {
        IndexSummary {
            docs: self.engine.num_docs(),
            terms: self.engine.num_terms(),
            index_path: self.index_path.display().to_string(),
        }
    }
}

pub fn build_app(index_path: String) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState::load(index_path, admin_token)?;
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status_handler))
        .route("/search", get(search_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let mode = params.mode.as_deref().map(SearchMode::parse).unwrap_or_default();
    let mut results = state.engine.search(&params.q, mode);
    let total_hits = results.len();
    results.truncate(params.k.clamp(1, 100));
    let took_s = start.elapsed().as_secs_f64();
    tracing::debug!(query = %params.q, %mode, total_hits, took_s, "search served");
    Json(SearchResponse { query: params.q, mode, took_s, total_hits, results })
}

pub async fn status_handler(State(state): State<AppState>) -> Json<IndexSummary> {
    Json(state.summary())
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<IndexSummary>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    state.reload().await.map_err(|e| {
        tracing::error!(error = %e, "index reload failed");
        (error_status(&e), e.to_string())
    })?;
    Ok(Json(state.summary()))
}

pub fn error_status(err: &Error) -> StatusCode {
    if err.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::INTERNAL_SERVER_ERROR }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
