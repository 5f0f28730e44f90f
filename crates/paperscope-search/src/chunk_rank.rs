//! Cross-paper chunk ranking.
//!
//! Used when a question needs evidence from several papers: each paper's
//! block texts are scored against the query vector, the best few per paper
//! become candidates, and the candidates are merged into one global top list.

use serde::Serialize;

use paperscope_core::{cosine_similarity, Error, Result, Vector};

/// A block text scored against a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub paper_id: String,
    pub text: String,
    pub score: f32,
}

fn by_score_desc(a: &RankedChunk, b: &RankedChunk) -> std::cmp::Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(std::cmp::Ordering::Equal)
}

/// Best `per_paper` texts of one paper by cosine similarity to `query`.
pub fn top_chunks(
    paper_id: &str,
    query: &Vector,
    texts: Vec<String>,
    vectors: &[Vector],
    per_paper: usize,
) -> Result<Vec<RankedChunk>> {
    if texts.len() != vectors.len() {
        return Err(Error::Embedding(format!(
            "expected {} vectors, got {}",
            texts.len(),
            vectors.len()
        )));
    }
    let q = query.as_slice();
    let mut scored: Vec<RankedChunk> = texts
        .into_iter()
        .zip(vectors)
        .map(|(text, v)| RankedChunk {
            paper_id: paper_id.to_string(),
            score: cosine_similarity(q, v.as_slice()),
            text,
        })
        .collect();
    scored.sort_by(by_score_desc);
    scored.truncate(per_paper);
    Ok(scored)
}

/// Merge per-paper candidates and keep the global best `k`.
pub fn merge_top(mut candidates: Vec<RankedChunk>, k: usize) -> Vec<RankedChunk> {
    candidates.sort_by(by_score_desc);
    candidates.truncate(k);
    candidates
}
