use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use search_core::persist::IndexPaths;
use search_core::{EngineConfig, QueryMode, SearchEngine, SearchHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Ranked,
    Boolean,
}

impl From<Mode> for QueryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ranked => QueryMode::Ranked,
            Mode::Boolean => QueryMode::Boolean,
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ResultEntry>,
}

#[derive(Serialize)]
pub struct ResultEntry {
    pub doc_id: u32,
    pub score: f32,
    pub url: String,
    pub title: String,
    pub summary: String,
}

impl From<SearchHit> for ResultEntry {
    fn from(hit: SearchHit) -> Self {
        Self { doc_id: hit.doc_id, score: hit.score, url: hit.url, title: hit.title, summary: hit.summary }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

pub fn build_app(index_dir: &str, config: EngineConfig) -> Router {
    let engine = SearchEngine::open(&IndexPaths::new(index_dir), config);
    router(Arc::new(engine))
}

pub fn router(engine: Arc<SearchEngine>) -> Router {
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
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    if params.q.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty query".into()));
    }
    let k = params.k.unwrap_or(state.engine.config().result_limit).clamp(1, MAX_K);
    let results = state.engine.search(&params.q, params.mode.into(), k);
    tracing::debug!(query = %params.q, hits = results.total_hits, "search served");
    Ok(Json(SearchResponse {
        query: params.q,
        took_ms: results.took.as_millis(),
        took_s: results.took.as_secs_f64(),
        total_hits: results.total_hits,
        results: results.hits.into_iter().map(ResultEntry::from).collect(),
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let (url, summary) = state
        .engine
        .document(doc_id)
        .ok_or((StatusCode::NOT_FOUND, "not found".to_string()))?;
    let mut obj = serde_json::json!({ "doc_id": doc_id, "url": url });
    if let Some(s) = summary {
        obj["title"] = serde_json::Value::String(s.title.clone());
        obj["summary"] = serde_json::Value::String(s.summary.clone());
    }
    Ok(Json(obj))
}
