//! Core traits for paperscope.
//!
//! Every external collaborator (embedding model, language model, vector
//! index, document source) sits behind one of these traits so that the
//! segmentation and retrieval pipelines can be constructed with explicit
//! dependencies and exercised against in-memory implementations in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::models::{ChunkHit, IndexHit, PaperRecord, StoredChunk, Vector};

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns one embedding vector per input text, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("backend returned no vector".to_string()))
    }

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate text constrained to a JSON object, with system context.
    ///
    /// Backends without native JSON enforcement fall back to plain generation;
    /// callers still validate the output.
    async fn generate_json_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_system(system, prompt).await
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// INDEX TRAITS
// =============================================================================

/// Vector index over paper metadata.
#[async_trait]
pub trait PaperIndex: Send + Sync {
    /// Insert or replace papers with their embeddings.
    async fn upsert(&self, papers: &[(PaperRecord, Vector)]) -> Result<()>;

    /// Nearest-neighbour search returning up to `k` hits in descending
    /// similarity order, restricted to papers matching `filter`.
    async fn search(
        &self,
        query: &Vector,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>>;

    /// Fetch stored metadata for the given ids (missing ids are skipped).
    async fn get(&self, ids: &[String]) -> Result<Vec<PaperRecord>>;

    /// Replace metadata of existing papers, keeping their embeddings.
    async fn update(&self, papers: &[PaperRecord]) -> Result<usize>;

    /// Number of indexed papers.
    async fn count(&self) -> Result<usize>;
}

/// Per-paper collection of embedded chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace the chunk collection of a paper.
    async fn replace_chunks(&self, paper_id: &str, chunks: &[StoredChunk]) -> Result<()>;

    /// Top-`k` chunks of a paper by similarity to `query`.
    async fn search_chunks(&self, paper_id: &str, query: &Vector, k: usize)
        -> Result<Vec<ChunkHit>>;

    /// Number of chunks stored for a paper (0 when the paper was never processed).
    async fn chunk_count(&self, paper_id: &str) -> Result<usize>;
}

// =============================================================================
// DOCUMENT TRAITS
// =============================================================================

/// Source of raw document bytes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the document identified by `locator`.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}
