//! Agent tools backed by the chunk store and the paper index.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

use paperscope_core::defaults::{
    CROSS_PAPER_CHUNKS_PER_PAPER, CROSS_PAPER_PAPERS, CROSS_PAPER_TOP_K, PAPER_TOOL_K,
};
use paperscope_core::{ChunkStore, EmbeddingBackend, Error, Result};
use paperscope_search::{merge_top, top_chunks, RetrievalOrchestrator};
use paperscope_segment::PaperChunker;

use super::chat_agent::{AgentTool, ToolContext};

fn required_str<'a>(input: &'a JsonValue, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("tool input needs a non-empty '{}'", key)))
}

/// Similarity search inside one paper's chunk collection.
pub struct SearchPaperContent {
    embedder: Arc<dyn EmbeddingBackend>,
    chunks: Arc<dyn ChunkStore>,
}

impl SearchPaperContent {
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, chunks: Arc<dyn ChunkStore>) -> Self {
        Self { embedder, chunks }
    }

    /// Top chunk texts of `arxiv_id` for `query`, joined with blank lines.
    #[instrument(skip(self), fields(subsystem = "api", component = "paper_tools", op = "search_paper_content"))]
    pub async fn search(&self, query: &str, arxiv_id: &str) -> Result<String> {
        let vector = self.embedder.embed_text(query).await?;
        let hits = self
            .chunks
            .search_chunks(arxiv_id, &vector, PAPER_TOOL_K)
            .await?;
        debug!(result_count = hits.len(), "Paper content searched");
        Ok(hits
            .into_iter()
            .map(|h| h.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl AgentTool for SearchPaperContent {
    fn name(&self) -> &'static str {
        "search_paper_content"
    }

    fn description(&self) -> &'static str {
        r#"search the full text of the current paper. Input: {"query": "<keywords>", "arxiv_id": "<id>"}"#
    }

    async fn call(&self, input: &JsonValue, ctx: &ToolContext) -> Result<String> {
        let query = required_str(input, "query")?;
        let arxiv_id = required_str(input, "arxiv_id").unwrap_or(ctx.arxiv_id.as_str());
        self.search(query, arxiv_id).await
    }
}

/// Evidence from the papers most relevant to a query.
pub struct SearchAllPapers {
    retrieval: RetrievalOrchestrator,
    chunker: PaperChunker,
}

impl SearchAllPapers {
    pub fn new(retrieval: RetrievalOrchestrator, chunker: PaperChunker) -> Self {
        Self { retrieval, chunker }
    }

    /// Smart-search for a few papers, segment each, and return the best
    /// chunk texts across all of them, joined with blank lines.
    ///
    /// A paper that cannot be fetched or segmented is skipped.
    #[instrument(skip(self), fields(subsystem = "api", component = "paper_tools", op = "search_all_papers"))]
    pub async fn search(&self, query: &str) -> Result<String> {
        let outcome = self.retrieval.smart_search(query, CROSS_PAPER_PAPERS).await?;
        let embedder = self.retrieval.embedder();
        let query_vector = embedder.embed_text(query).await?;

        let mut candidates = Vec::new();
        for scored in &outcome.results {
            let paper_id = scored.paper.id.as_str();
            let texts = match self.chunker.paper_texts(paper_id).await {
                Ok(texts) => texts,
                Err(e) => {
                    warn!(paper_id, error = %e, "Skipping paper in cross-paper search");
                    continue;
                }
            };
            let vectors = embedder.embed_texts(&texts).await?;
            candidates.extend(top_chunks(
                paper_id,
                &query_vector,
                texts,
                &vectors,
                CROSS_PAPER_CHUNKS_PER_PAPER,
            )?);
        }

        let best = merge_top(candidates, CROSS_PAPER_TOP_K);
        debug!(
            paper_count = outcome.results.len(),
            result_count = best.len(),
            "Cross-paper search complete"
        );
        Ok(best
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl AgentTool for SearchAllPapers {
    fn name(&self) -> &'static str {
        "search_all_papers"
    }

    fn description(&self) -> &'static str {
        r#"search across all indexed papers. Input: {"query": "<keywords>"}"#
    }

    async fn call(&self, input: &JsonValue, _ctx: &ToolContext) -> Result<String> {
        self.search(required_str(input, "query")?).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use paperscope_core::{
        BlockKind, ContentBlock, DocumentSource, PaperIndex, PaperRecord, Region, StoredChunk,
        Vector,
    };
    use paperscope_db::{InMemoryChunkStore, InMemoryPaperIndex};
    use paperscope_inference::mock::{MockEmbeddingBackend, MockGenerationBackend};
    use paperscope_search::QueryIntentAnalyzer;
    use paperscope_segment::{DocumentLoader, LayoutExtractor, PageSnapshot, SnapshotOptions};
    use serde_json::json;

    async fn tool() -> SearchPaperContent {
        let chunks = Arc::new(InMemoryChunkStore::new());
        let rows: Vec<StoredChunk> = [
            ("attention is computed per head", vec![1.0, 0.0]),
            ("related work", vec![0.0, 1.0]),
            ("multi-head attention concatenates heads", vec![0.9, 0.1]),
            ("heads are projected", vec![0.7, 0.3]),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (text, v))| StoredChunk {
            chunk_index: i,
            text: text.to_string(),
            embedding: Vector::from(v),
        })
        .collect();
        chunks.replace_chunks("2401.00001", &rows).await.unwrap();

        let embedder = MockEmbeddingBackend::new()
            .with_dimension(2)
            .with_vector("attention heads", vec![1.0, 0.0]);
        SearchPaperContent::new(Arc::new(embedder), chunks)
    }

    #[tokio::test]
    async fn test_search_paper_content_top_three_joined() {
        let out = tool().await.search("attention heads", "2401.00001").await.unwrap();
        assert_eq!(
            out,
            "attention is computed per head\n\nmulti-head attention concatenates heads\n\nheads are projected"
        );
    }

    #[tokio::test]
    async fn test_tool_input_defaults_to_request_paper() {
        let tool = tool().await;
        let ctx = ToolContext {
            arxiv_id: "2401.00001".to_string(),
        };
        let out = tool
            .call(&json!({"query": "attention heads"}), &ctx)
            .await
            .unwrap();
        assert!(out.starts_with("attention is computed per head"));

        let err = tool.call(&json!({"arxiv_id": "x"}), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    const HYDE: &str = "A hypothetical abstract on scaled dot-product attention.";
    const QUESTION: &str = "how is attention scaled";

    /// Serves the arXiv id itself as the PDF body, failing for one paper.
    struct EchoSource {
        failing: &'static str,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentSource for EchoSource {
        async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(locator.to_string());
            if locator == self.failing {
                return Err(Error::Fetch(format!("HTTP 503 for {}", locator)));
            }
            Ok(locator.as_bytes().to_vec())
        }
    }

    /// One page whose text blocks are the texts registered for the paper id
    /// found in the downloaded file.
    struct TextLoader {
        papers: Vec<(&'static str, Vec<String>)>,
    }

    impl DocumentLoader for TextLoader {
        fn snapshot(&self, path: &Path, _options: &SnapshotOptions) -> Result<Vec<PageSnapshot>> {
            let id = std::fs::read_to_string(path)?;
            let texts = self
                .papers
                .iter()
                .find(|(paper, _)| *paper == id)
                .map(|(_, texts)| texts.clone())
                .unwrap_or_default();
            let text_blocks = texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    let y = 72.0 + 50.0 * i as f32;
                    ContentBlock {
                        page: 1,
                        bbox: Region::new(72.0, y, 540.0, y + 40.0),
                        text,
                        kind: BlockKind::Text,
                    }
                })
                .collect();
            Ok(vec![PageSnapshot {
                page: 1,
                text_blocks,
                images: vec![],
                diagrams: vec![],
            }])
        }
    }

    fn at_angle(theta: f32) -> Vec<f32> {
        vec![theta.cos(), theta.sin()]
    }

    fn record(id: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            abstract_text: String::new(),
            authors: "A. Author".to_string(),
            categories: "cs.LG".to_string(),
            year: 2023,
        }
    }

    /// Chunk texts with their angle to the question vector [1, 0].
    fn texts(prefix: &str, angles: &[f32]) -> Vec<(String, f32)> {
        angles
            .iter()
            .enumerate()
            .map(|(i, a)| (format!("{} chunk {}", prefix, i), *a))
            .collect()
    }

    async fn cross_paper_tool() -> (SearchAllPapers, Arc<EchoSource>, MockEmbeddingBackend) {
        let alpha = texts("alpha", &[0.0, 0.2, 0.4, 1.0, 1.3, 1.5]);
        let beta = texts("beta", &[0.1, 0.3, 1.4]);

        let mut embedder = MockEmbeddingBackend::new()
            .with_dimension(2)
            .with_vector(HYDE, vec![1.0, 0.0])
            .with_vector(QUESTION, vec![1.0, 0.0]);
        for (text, angle) in alpha.iter().chain(beta.iter()) {
            embedder = embedder.with_vector(text.clone(), at_angle(*angle));
        }

        let index = Arc::new(InMemoryPaperIndex::new());
        index
            .upsert(&[
                (record("2401.00001"), Vector::from(at_angle(0.0))),
                (record("2401.00002"), Vector::from(at_angle(0.1))),
                (record("2401.00003"), Vector::from(at_angle(0.2))),
                // Fourth best: outside the three papers consulted.
                (record("2401.00004"), Vector::from(at_angle(0.3))),
            ])
            .await
            .unwrap();

        let llm = MockGenerationBackend::new()
            .with_rule("5-6 sentences", HYDE)
            .with_default_response(r#"{"query_content": "attention scaling"}"#);
        let retrieval = RetrievalOrchestrator::new(
            QueryIntentAnalyzer::new(Arc::new(llm)),
            Arc::new(embedder.clone()),
            index,
        );

        let source = Arc::new(EchoSource {
            failing: "2401.00003",
            requests: Mutex::new(Vec::new()),
        });
        let loader = TextLoader {
            papers: vec![
                ("2401.00001", alpha.into_iter().map(|(t, _)| t).collect()),
                ("2401.00002", beta.into_iter().map(|(t, _)| t).collect()),
            ],
        };
        let chunker = PaperChunker::new(
            source.clone(),
            LayoutExtractor::new(Arc::new(loader), None),
            Arc::new(embedder.clone()),
            Arc::new(InMemoryChunkStore::new()),
        );

        (SearchAllPapers::new(retrieval, chunker), source, embedder)
    }

    #[tokio::test]
    async fn test_search_all_papers_merges_best_chunks() {
        let (tool, source, embedder) = cross_paper_tool().await;
        let out = tool.search(QUESTION).await.unwrap();

        assert_eq!(
            out,
            "alpha chunk 0\n\nbeta chunk 0\n\nalpha chunk 1\n\nbeta chunk 1\n\nalpha chunk 2"
        );

        // Three papers consulted; the one that failed to download is skipped.
        assert_eq!(
            *source.requests.lock().unwrap(),
            vec!["2401.00001", "2401.00002", "2401.00003"]
        );

        // The question is embedded, and each paper's texts in one batch.
        let calls = embedder.calls();
        assert!(calls.contains(&vec![QUESTION.to_string()]));
        assert!(calls.iter().any(|batch| batch.len() == 6 && batch[0] == "alpha chunk 0"));
        assert!(calls.iter().any(|batch| batch.len() == 3 && batch[0] == "beta chunk 0"));
    }

    #[tokio::test]
    async fn test_search_all_papers_requires_query() {
        let (tool, source, _) = cross_paper_tool().await;
        let ctx = ToolContext {
            arxiv_id: "2401.00001".to_string(),
        };
        let err = tool.call(&json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(source.requests.lock().unwrap().is_empty());
    }
}
