//! HTTP handlers for paperscope-api.

pub mod paper;
pub mod search;

use axum::{response::IntoResponse, Json};

pub use paper::{chat_with_chunk, process_paper_with_coords};
pub use search::{search_papers, smart_search};

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
