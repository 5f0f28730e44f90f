//! Multi-stage paper retrieval.
//!
//! Smart search runs four stages:
//!
//! 1. intent extraction and HyDE rewrite ([`QueryIntentAnalyzer`]);
//! 2. index filter construction from the year bounds;
//! 3. nearest-neighbour search for the HyDE passage, over-fetching
//!    `k * overfetch_factor` candidates;
//! 4. author and category post-filters in index order, stopping at `k`.
//!
//! Category and author are never pushed down to the index: stored values are
//! free-form strings matched by case-insensitive substring.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use paperscope_core::defaults::{OVERFETCH_FACTOR, YEAR_FIELD};
use paperscope_core::{
    EmbeddingBackend, Error, IndexHit, MetadataFilter, PaperIndex, Result, ScoredPaper,
    SearchIntent, SmartSearchOutcome,
};

use crate::intent::QueryIntentAnalyzer;

/// Index filter for the year bounds of an intent.
///
/// `year_start` is inclusive and `year_end` exclusive; both together are
/// combined with AND. Returns `None` when neither bound is set.
pub fn build_index_filter(intent: &SearchIntent) -> Option<MetadataFilter> {
    let mut filters = Vec::new();
    if let Some(start) = intent.year_start {
        filters.push(MetadataFilter::gte(YEAR_FIELD, start as i64));
    }
    if let Some(end) = intent.year_end {
        filters.push(MetadataFilter::lt(YEAR_FIELD, end as i64));
    }
    match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(MetadataFilter::and(filters)),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True when `hit` satisfies the author and category constraints of `intent`.
pub fn passes_post_filters(hit: &IndexHit, intent: &SearchIntent) -> bool {
    if let Some(author) = &intent.author {
        if !contains_ignore_case(&hit.paper.authors, author) {
            return false;
        }
    }
    if let Some(category) = &intent.category {
        if !contains_ignore_case(&hit.paper.categories, category) {
            return false;
        }
    }
    true
}

/// Keep hits passing the post-filters, in their original order, up to `k`.
pub fn post_filter(hits: Vec<IndexHit>, intent: &SearchIntent, k: usize) -> Vec<ScoredPaper> {
    hits.into_iter()
        .filter(|hit| passes_post_filters(hit, intent))
        .take(k)
        .map(ScoredPaper::from)
        .collect()
}

/// Coordinates intent analysis, embedding and index search.
#[derive(Clone)]
pub struct RetrievalOrchestrator {
    analyzer: QueryIntentAnalyzer,
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn PaperIndex>,
    overfetch_factor: usize,
}

impl RetrievalOrchestrator {
    pub fn new(
        analyzer: QueryIntentAnalyzer,
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn PaperIndex>,
    ) -> Self {
        Self {
            analyzer,
            embedder,
            index,
            overfetch_factor: OVERFETCH_FACTOR,
        }
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    pub fn analyzer(&self) -> &QueryIntentAnalyzer {
        &self.analyzer
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.embedder
    }

    /// Interpret `query`, search with its HyDE passage and return up to `k`
    /// papers in index order.
    ///
    /// Fewer than `k` survivors of the post-filters yield a shorter list; the
    /// index is not queried again.
    #[instrument(skip(self, query), fields(subsystem = "search", component = "retrieval", op = "smart_search"))]
    pub async fn smart_search(&self, query: &str, k: usize) -> Result<SmartSearchOutcome> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".to_string()));
        }
        let start = Instant::now();

        let (intent, hyde_text) = self.analyzer.interpret(query).await?;
        let filter = build_index_filter(&intent);
        if let Some(f) = &filter {
            debug!(filter = %f.to_json(), "Index filter built");
        }

        let query_vector = self.embedder.embed_text(&hyde_text).await?;
        let candidate_k = k.saturating_mul(self.overfetch_factor);
        let hits = self
            .index
            .search(&query_vector, candidate_k, filter.as_ref())
            .await?;
        let candidate_count = hits.len();

        let results = post_filter(hits, &intent, k);

        info!(
            candidate_count,
            result_count = results.len(),
            filtered_out = candidate_count - results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Smart search complete"
        );

        Ok(SmartSearchOutcome {
            original_query: query.to_string(),
            intent,
            hyde_text,
            results,
        })
    }

    /// Plain nearest-neighbour search on the raw query text.
    #[instrument(skip(self, query), fields(subsystem = "search", component = "retrieval", op = "search"))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPaper>> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".to_string()));
        }
        let query_vector = self.embedder.embed_text(query).await?;
        let hits = self.index.search(&query_vector, k, None).await?;
        debug!(result_count = hits.len(), "Search complete");
        Ok(hits.into_iter().map(ScoredPaper::from).collect())
    }
}
