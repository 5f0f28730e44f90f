//! Search HTTP handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use paperscope_core::defaults::SEARCH_K;
use paperscope_core::ScoredPaper;

use crate::{ApiError, AppState};

/// Raw query parameters; validated by hand so errors keep the JSON shape.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub k: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub original_query: String,
    /// The raw query for plain search, the structured intent for smart search.
    pub interpreted_intent: JsonValue,
    pub results: Vec<ScoredPaper>,
}

fn required_query(params: &SearchParams) -> Result<String, ApiError> {
    params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing 'query' parameter".into()))
}

fn parse_k(raw: &str) -> Result<usize, ApiError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|k| *k > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("'k' must be a positive integer, got '{}'", raw)))
}

/// Plain top-k similarity search on the raw query.
///
/// # Query Parameters
/// - `query`: search text (required)
/// - `k`: result count (optional, default 5)
pub async fn search_papers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = required_query(&params)?;
    let k = match params.k.as_deref() {
        Some(raw) => parse_k(raw)?,
        None => SEARCH_K,
    };

    let results = state.retrieval.search(&query, k).await?;
    Ok(Json(SearchResponse {
        interpreted_intent: JsonValue::String(query.clone()),
        original_query: query,
        results,
    }))
}

/// Intent-aware search: filters, HyDE rewrite, over-fetch and post-filters.
///
/// # Query Parameters
/// - `query`: search text (required)
/// - `k`: result count (required)
pub async fn smart_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = required_query(&params)?;
    let k = params
        .k
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing 'k' parameter".into()))
        .and_then(parse_k)?;

    let outcome = state.retrieval.smart_search(&query, k).await?;
    let interpreted_intent = serde_json::to_value(&outcome.intent)
        .map_err(paperscope_core::Error::from)?;
    Ok(Json(SearchResponse {
        original_query: outcome.original_query,
        interpreted_intent,
        results: outcome.results,
    }))
}
