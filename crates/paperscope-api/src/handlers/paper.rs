//! Paper segmentation and chat HTTP handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use paperscope_core::ClusteredBlock;

use crate::services::{ChatRequest, ChatTurn};
use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct ProcessPaperResponse {
    pub chunks: Vec<ClusteredBlock>,
}

/// Segment a paper into positioned, cluster-labelled chunks.
///
/// Also replaces the paper's chunk collection used by the chat tools.
///
/// # Returns
/// - 200 OK with `{chunks: [{page, bbox, text, kind, cluster_id, id}]}`
/// - 400 Bad Request for a malformed id or a paper without extractable text
/// - 502 Bad Gateway when the PDF cannot be fetched
pub async fn process_paper_with_coords(
    State(state): State<AppState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<ProcessPaperResponse>, ApiError> {
    let chunks = state
        .chunker
        .chunk_paper(arxiv_id.trim_start_matches('/'))
        .await?;
    Ok(Json(ProcessPaperResponse { chunks }))
}

/// Request body for a chunk-focused question.
#[derive(Debug, Deserialize)]
pub struct ChatWithChunkRequest {
    pub chunk_text: Option<String>,
    pub chunk_id: Option<JsonValue>,
    pub question: Option<String>,
    pub arxiv_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatWithChunkResponse {
    pub answer: String,
}

/// Answer a question about the focused chunk with the chat agent.
///
/// Agent failures never surface as errors: the answer is then the fallback text.
pub async fn chat_with_chunk(
    State(state): State<AppState>,
    Json(req): Json<ChatWithChunkRequest>,
) -> Result<Json<ChatWithChunkResponse>, ApiError> {
    let arxiv_id = req
        .arxiv_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Arxiv ID required".into()))?;
    let question = req
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Question required".into()))?;

    let run = state
        .agent
        .run(&ChatRequest {
            arxiv_id,
            chunk_id: req.chunk_id,
            chunk_text: req.chunk_text.unwrap_or_default(),
            question,
            history: req.history,
        })
        .await;

    Ok(Json(ChatWithChunkResponse { answer: run.answer }))
}
