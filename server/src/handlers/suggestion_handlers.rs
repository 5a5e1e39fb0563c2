use std::time::{Duration, Instant};

use axum::{extract::Query, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

const CACHE_TTL: Duration = Duration::from_secs(300);
const MIN_QUERY_LEN: usize = 2;

#[derive(Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search-suggestions?q=par
pub async fn search_suggestions(
    Extension(state): Extension<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let q = query.q.trim().to_lowercase();
    if q.chars().count() < MIN_QUERY_LEN {
        return Ok((
            StatusCode::OK,
            Json(json!({ "suggestions": Vec::<String>::new() })),
        ));
    }

    if let Some(entry) = state.suggestions.get(&q) {
        let (fetched_at, cached) = entry.value();
        if fetched_at.elapsed() < CACHE_TTL {
            return Ok((StatusCode::OK, Json(json!({ "suggestions": cached }))));
        }
    }

    let suggestions = state.weather.suggestions(&q).await.map_err(|e| {
        tracing::error!("search_suggestions {q:?}: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not fetch suggestions" })),
        )
    })?;

    state
        .suggestions
        .insert(q, (Instant::now(), suggestions.clone()));
    Ok((StatusCode::OK, Json(json!({ "suggestions": suggestions }))))
}
