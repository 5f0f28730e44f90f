//! Paper chunking pipeline: fetch, extract, embed, store, cluster.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use paperscope_core::{
    ChunkStore, ClusteredBlock, ContentBlock, DocumentSource, EmbeddingBackend, Error, Result,
    StoredChunk,
};

use crate::cluster::AdaptiveClusterer;
use crate::fetch::{validate_arxiv_id, TempArtifact};
use crate::layout::LayoutExtractor;

/// Turns an arXiv identifier into cluster-labelled, positioned blocks and
/// keeps the paper's chunk collection in sync.
#[derive(Clone)]
pub struct PaperChunker {
    source: Arc<dyn DocumentSource>,
    extractor: LayoutExtractor,
    embedder: Arc<dyn EmbeddingBackend>,
    chunks: Arc<dyn ChunkStore>,
    clusterer: AdaptiveClusterer,
    temp_dir: Option<PathBuf>,
}

impl PaperChunker {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: LayoutExtractor,
        embedder: Arc<dyn EmbeddingBackend>,
        chunks: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            source,
            extractor,
            embedder,
            chunks,
            clusterer: AdaptiveClusterer::default(),
            temp_dir: None,
        }
    }

    /// Directory for downloaded PDFs. Defaults to the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_clusterer(mut self, clusterer: AdaptiveClusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    /// Fetch and segment a paper without touching its chunk collection.
    async fn extract_blocks(&self, arxiv_id: &str) -> Result<Vec<ContentBlock>> {
        validate_arxiv_id(arxiv_id)?;
        let bytes = self.source.fetch(arxiv_id).await?;

        let artifact = TempArtifact::write(self.temp_dir.as_deref(), &bytes)?;
        let blocks = self.extractor.extract(artifact.path()).await?;
        drop(artifact);

        if blocks.is_empty() {
            return Err(Error::InvalidInput("No text found".to_string()));
        }
        Ok(blocks)
    }

    /// Segment a paper, replace its chunk collection and return the blocks
    /// labelled with semantic clusters.
    #[instrument(skip(self), fields(subsystem = "segment", component = "paper_chunker", op = "chunk_paper"))]
    pub async fn chunk_paper(&self, arxiv_id: &str) -> Result<Vec<ClusteredBlock>> {
        let start = Instant::now();
        let blocks = self.extract_blocks(arxiv_id).await?;
        let texts: Vec<String> = blocks.iter().map(|b| b.text.clone()).collect();

        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let stored: Vec<StoredChunk> = texts
            .into_iter()
            .zip(vectors.iter())
            .enumerate()
            .map(|(chunk_index, (text, embedding))| StoredChunk {
                chunk_index,
                text,
                embedding: embedding.clone(),
            })
            .collect();
        self.chunks.replace_chunks(arxiv_id, &stored).await?;

        let raw: Vec<Vec<f32>> = vectors.into_iter().map(|v| v.to_vec()).collect();
        let labels = self.clusterer.cluster(&raw);

        let clustered: Vec<ClusteredBlock> = blocks
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(id, (block, cluster_id))| ClusteredBlock {
                block,
                cluster_id,
                id,
            })
            .collect();

        info!(
            paper_id = arxiv_id,
            chunk_count = clustered.len(),
            cluster_count = clustered.last().map_or(0, |c| c.cluster_id + 1),
            duration_ms = start.elapsed().as_millis() as u64,
            "Paper chunked"
        );
        Ok(clustered)
    }

    /// Block texts of a paper in document order.
    #[instrument(skip(self), fields(subsystem = "segment", component = "paper_chunker", op = "paper_texts"))]
    pub async fn paper_texts(&self, arxiv_id: &str) -> Result<Vec<String>> {
        let blocks = self.extract_blocks(arxiv_id).await?;
        Ok(blocks.into_iter().map(|b| b.text).collect())
    }
}
