//! Core data models for paperscope.
//!
//! These types are shared across all paperscope crates and represent
//! the core domain entities: segmented document blocks, paper metadata,
//! search intents and scored results.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

pub use pgvector::Vector;

use crate::geometry::Region;

// =============================================================================
// DOCUMENT BLOCKS
// =============================================================================

/// Kind of content a block was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Diagram,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Diagram => "diagram",
        }
    }
}

/// One typed, positioned unit of document content.
///
/// Blocks are produced in reading order: by page, then by pass within the
/// page (text, image, diagram), then by discovery order within the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// 1-based page number.
    pub page: u32,
    pub bbox: Region,
    pub text: String,
    pub kind: BlockKind,
}

/// A content block annotated with its position and cluster label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredBlock {
    #[serde(flatten)]
    pub block: ContentBlock,
    pub cluster_id: usize,
    /// 0-based position of the block in the document sequence.
    pub id: usize,
}

// =============================================================================
// PAPERS
// =============================================================================

/// Metadata stored for each paper in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub categories: String,
    /// Publication year, 0 when unknown.
    pub year: i32,
}

impl PaperRecord {
    /// Text embedded for the paper: title, categories and abstract.
    pub fn document_text(&self) -> String {
        format!(
            "Title: {}\nCategories: {}\nAbstract: {}",
            self.title, self.categories, self.abstract_text
        )
    }
}

/// Raw index hit with cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub paper: PaperRecord,
    pub score: f32,
}

/// Paper returned to search callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPaper {
    #[serde(flatten)]
    pub paper: PaperRecord,
    pub similarity_score: f32,
}

impl From<IndexHit> for ScoredPaper {
    fn from(hit: IndexHit) -> Self {
        Self {
            paper: hit.paper,
            similarity_score: hit.score,
        }
    }
}

// =============================================================================
// PER-PAPER CHUNKS
// =============================================================================

/// A block text with its embedding, as stored in a paper's chunk collection.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vector,
}

/// Chunk returned by a per-paper similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkHit {
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}

// =============================================================================
// SEARCH INTENT
// =============================================================================

/// Requested ordering of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Relevance,
    Date,
}

/// Structured interpretation of a free-text search query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    #[serde(default)]
    pub query_content: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year_start: Option<i32>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year_end: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_sort_by")]
    pub sort_by: Option<SortBy>,
}

/// Accepts integers, integral floats and numeric strings; anything else is `None`.
fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Some(JsonValue::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    })
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) if !s.trim().is_empty() && s.trim() != "null" => {
            Some(s.trim().to_string())
        }
        _ => None,
    })
}

fn lenient_sort_by<'de, D>(deserializer: D) -> std::result::Result<Option<SortBy>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortBy::Relevance),
            "date" => Some(SortBy::Date),
            _ => None,
        },
        _ => None,
    })
}

/// Result of a smart search: the interpreted intent, the HyDE passage that
/// was embedded, and the accepted papers in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartSearchOutcome {
    pub original_query: String,
    pub intent: SearchIntent,
    pub hyde_text: String,
    pub results: Vec<ScoredPaper>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_paper() -> PaperRecord {
        PaperRecord {
            id: "2401.00001".to_string(),
            title: "Sparse Attention".to_string(),
            abstract_text: "We study sparse attention.".to_string(),
            authors: "A. Researcher, B. Scientist".to_string(),
            categories: "cs.LG cs.CL".to_string(),
            year: 2024,
        }
    }

    #[test]
    fn test_document_text_format() {
        assert_eq!(
            sample_paper().document_text(),
            "Title: Sparse Attention\nCategories: cs.LG cs.CL\nAbstract: We study sparse attention."
        );
    }

    #[test]
    fn test_scored_paper_flattens_metadata() {
        let scored = ScoredPaper {
            paper: sample_paper(),
            similarity_score: 0.75,
        };
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["id"], "2401.00001");
        assert_eq!(value["abstract"], "We study sparse attention.");
        assert_eq!(value["year"], 2024);
        assert_eq!(value["similarity_score"], 0.75);
    }

    #[test]
    fn test_clustered_block_shape() {
        let block = ClusteredBlock {
            block: ContentBlock {
                page: 2,
                bbox: Region::new(0.0, 0.0, 100.0, 50.0),
                text: "hello".to_string(),
                kind: BlockKind::Text,
            },
            cluster_id: 1,
            id: 4,
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "page": 2,
                "bbox": [0.0, 0.0, 100.0, 50.0],
                "text": "hello",
                "kind": "text",
                "cluster_id": 1,
                "id": 4
            })
        );
    }

    #[test]
    fn test_intent_accepts_numeric_strings() {
        let intent: SearchIntent = serde_json::from_value(json!({
            "query_content": "graph neural networks",
            "year_start": "2021",
            "year_end": 2024,
            "category": "cs.LG",
            "author": null,
            "sort_by": "Date"
        }))
        .unwrap();
        assert_eq!(intent.year_start, Some(2021));
        assert_eq!(intent.year_end, Some(2024));
        assert_eq!(intent.category.as_deref(), Some("cs.LG"));
        assert_eq!(intent.author, None);
        assert_eq!(intent.sort_by, Some(SortBy::Date));
    }

    #[test]
    fn test_intent_missing_fields_default() {
        let intent: SearchIntent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(intent, SearchIntent::default());
    }

    #[test]
    fn test_intent_ignores_unknown_sort_and_blank_strings() {
        let intent: SearchIntent = serde_json::from_value(json!({
            "query_content": "x",
            "year_start": "recent",
            "category": "  ",
            "sort_by": "citations"
        }))
        .unwrap();
        assert_eq!(intent.year_start, None);
        assert_eq!(intent.category, None);
        assert_eq!(intent.sort_by, None);
    }
}
