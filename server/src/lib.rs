use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use parking_lot::Mutex;
use search_core::results::query_key;
use search_core::{ConcurrentIndex, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub reverse: bool,
    /// Leave the query out of history and favorites.
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub favorite: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    /// The query as searched: its unique stems joined by spaces.
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<ConcurrentIndex>,
    pub history: Arc<Mutex<Vec<String>>>,
    pub favorites: Arc<Mutex<BTreeSet<String>>>,
}

pub fn build_app(index: Arc<ConcurrentIndex>) -> Router {
    let app_state = AppState { index, history: Arc::default(), favorites: Arc::default() };

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
        .route("/index", get(index_handler))
        .route("/locations", get(locations_handler))
        .route("/history", get(history_handler).delete(clear_history_handler))
        .route("/favorites", get(favorites_handler).delete(clear_favorites_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    // Edge case: nothing left after stemming
    let Some((query, stems)) = query_key(&params.q) else {
        let elapsed = start.elapsed();
        return Ok(Json(SearchResponse { query: String::new(), took_s: elapsed.as_secs_f64(), total_hits: 0, results: vec![] }));
    };
    if !params.private {
        state.history.lock().push(query.clone());
        if params.favorite {
            state.favorites.lock().insert(query.clone());
        }
    }

    let index = Arc::clone(&state.index);
    let exact = params.exact;
    let mut results = tokio::task::spawn_blocking(move || index.search(&stems, exact))
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    if params.reverse {
        results.reverse();
    }
    tracing::debug!(%query, hits = results.len(), "search served");

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

/// word -> locations containing it
pub async fn index_handler(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<String>>> {
    let words = state.index.read(|index| {
        index
            .entries()
            .iter()
            .map(|(word, locations)| (word.clone(), locations.keys().cloned().collect()))
            .collect()
    });
    Json(words)
}

/// location -> total word count
pub async fn locations_handler(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.index.read(|index| index.counts().clone()))
}

/// Searched queries, most recent first.
pub async fn history_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.history.lock().iter().rev().cloned().collect())
}

pub async fn clear_history_handler(State(state): State<AppState>) -> StatusCode {
    state.history.lock().clear();
    StatusCode::NO_CONTENT
}

/// Favorited queries, sorted.
pub async fn favorites_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.favorites.lock().iter().cloned().collect())
}

pub async fn clear_favorites_handler(State(state): State<AppState>) -> StatusCode {
    state.favorites.lock().clear();
    StatusCode::NO_CONTENT
}
