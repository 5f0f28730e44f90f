//! End-to-end tests for smart search against the in-memory paper index.
//!
//! The generation mock answers the intent step from a script and the HyDE
//! step through a prompt rule; the HyDE passage embeds to a fixed query
//! vector so the index order is known in advance.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use paperscope_core::{
    Error, IndexHit, MetadataFilter, PaperIndex, PaperRecord, Result, SortBy, Vector,
};
use paperscope_db::InMemoryPaperIndex;
use paperscope_inference::mock::{MockEmbeddingBackend, MockGenerationBackend};
use paperscope_search::{QueryIntentAnalyzer, RetrievalOrchestrator};

const HYDE: &str = "We propose a graph neural network for molecular property prediction.";

fn paper(id: &str, year: i32, authors: &str, categories: &str) -> PaperRecord {
    PaperRecord {
        id: id.to_string(),
        title: format!("Paper {}", id),
        abstract_text: format!("Abstract of {}", id),
        authors: authors.to_string(),
        categories: categories.to_string(),
        year,
    }
}

/// Vector whose cosine similarity to [1, 0] decreases with `rank`.
fn ranked(rank: usize) -> Vector {
    let angle = rank as f32 * 0.1;
    Vector::from(vec![angle.cos(), angle.sin()])
}

async fn index() -> Arc<InMemoryPaperIndex> {
    let index = Arc::new(InMemoryPaperIndex::new());
    index
        .upsert(&[
            (paper("p0", 2019, "Ada Lovelace", "cs.LG"), ranked(0)),
            (paper("p1", 2021, "Alan Turing", "cs.AI"), ranked(1)),
            (paper("p2", 2022, "Grace Hopper", "cs.LG stat.ML"), ranked(2)),
            (paper("p3", 2023, "Ada Byron", "math.OC"), ranked(3)),
            (paper("p4", 2021, "Edsger Dijkstra", "cs.DS"), ranked(4)),
            (paper("p5", 2020, "Barbara Liskov", "cs.PL"), ranked(5)),
            (paper("p6", 2022, "Donald Knuth", "cs.DS"), ranked(6)),
            (paper("p7", 2022, "John McCarthy", "cs.AI"), ranked(7)),
            (paper("p8", 2022, "Claude Shannon", "cs.IT"), ranked(8)),
            (paper("p9", 2022, "Kurt Goedel, Ada Smith", "math.LO"), ranked(9)),
        ])
        .await
        .unwrap();
    index
}

/// Index wrapper that records the window size and filter of every search.
struct RecordingIndex {
    inner: Arc<InMemoryPaperIndex>,
    searches: Mutex<Vec<(usize, Option<Value>)>>,
}

impl RecordingIndex {
    fn new(inner: Arc<InMemoryPaperIndex>) -> Self {
        Self {
            inner,
            searches: Mutex::new(Vec::new()),
        }
    }

    fn searches(&self) -> Vec<(usize, Option<Value>)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaperIndex for RecordingIndex {
    async fn upsert(&self, papers: &[(PaperRecord, Vector)]) -> Result<()> {
        self.inner.upsert(papers).await
    }

    async fn search(
        &self,
        query: &Vector,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        self.searches
            .lock()
            .unwrap()
            .push((k, filter.map(MetadataFilter::to_json)));
        self.inner.search(query, k, filter).await
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<PaperRecord>> {
        self.inner.get(ids).await
    }

    async fn update(&self, papers: &[PaperRecord]) -> Result<usize> {
        self.inner.update(papers).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

fn orchestrator(
    intent_json: &str,
    index: Arc<dyn PaperIndex>,
) -> (RetrievalOrchestrator, MockGenerationBackend, MockEmbeddingBackend) {
    let llm = MockGenerationBackend::new()
        .with_rule("5-6 sentences", HYDE)
        .with_script([intent_json]);
    let embedder = MockEmbeddingBackend::new()
        .with_dimension(2)
        .with_vector(HYDE, vec![1.0, 0.0]);
    let analyzer = QueryIntentAnalyzer::new(Arc::new(llm.clone()));
    let retrieval = RetrievalOrchestrator::new(analyzer, Arc::new(embedder.clone()), index);
    (retrieval, llm, embedder)
}

#[tokio::test]
async fn test_year_range_is_pushed_down() {
    let (retrieval, llm, embedder) = orchestrator(
        r#"{"query_content": "gnn for molecules", "year_start": 2021, "year_end": 2023}"#,
        index().await,
    );

    let outcome = retrieval.smart_search("gnn for molecules 2021-2022", 3).await.unwrap();
    let ids: Vec<&str> = outcome.results.iter().map(|p| p.paper.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p4"]);
    assert!(outcome
        .results
        .iter()
        .all(|p| p.paper.year >= 2021 && p.paper.year < 2023));
    assert!(outcome
        .results
        .windows(2)
        .all(|w| w[0].similarity_score >= w[1].similarity_score));

    assert_eq!(outcome.original_query, "gnn for molecules 2021-2022");
    assert_eq!(outcome.hyde_text, HYDE);
    assert_eq!(outcome.intent.query_content, "gnn for molecules");

    // HyDE asked about the extracted topic, and only the HyDE text was embedded.
    assert!(llm.calls()[1].prompt.contains("\"gnn for molecules\""));
    assert_eq!(embedder.calls(), vec![vec![HYDE.to_string()]]);
}

#[tokio::test]
async fn test_author_post_filter_within_overfetch_window() {
    // k = 1, overfetch 4: the year filter leaves p1..p4 as candidates and only
    // p3 matches "ada"; p0 would match but predates 2020.
    let (retrieval, _, _) = orchestrator(
        r#"{"query_content": "analytical engines", "author": "ADA", "year_start": 2020}"#,
        index().await,
    );
    let outcome = retrieval.smart_search("papers by ada since 2020", 1).await.unwrap();
    let ids: Vec<&str> = outcome.results.iter().map(|p| p.paper.id.as_str()).collect();
    assert_eq!(ids, vec!["p3"]);
}

#[tokio::test]
async fn test_match_outside_overfetch_window_is_not_requeried() {
    // Only p9 matches "goedel"; with k = 2 the window holds 8 candidates.
    let (retrieval, _, _) = orchestrator(
        r#"{"query_content": "incompleteness", "author": "goedel"}"#,
        index().await,
    );
    let outcome = retrieval.smart_search("goedel", 2).await.unwrap();
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn test_category_filter_and_sort_by_carried() {
    let (retrieval, _, _) = orchestrator(
        r#"{"query_content": "algorithms", "category": "cs.ds", "sort_by": "date"}"#,
        index().await,
    );
    let outcome = retrieval.smart_search("recent algorithms papers", 5).await.unwrap();
    let ids: Vec<&str> = outcome.results.iter().map(|p| p.paper.id.as_str()).collect();
    // Index order is kept even though the intent asks for date order.
    assert_eq!(ids, vec!["p4", "p6"]);
    assert_eq!(outcome.intent.sort_by, Some(SortBy::Date));
}

#[tokio::test]
async fn test_intent_failure_stops_pipeline() {
    let (retrieval, llm, embedder) = orchestrator("I am unable to parse that.", index().await);
    let err = retrieval.smart_search("???", 5).await.unwrap_err();
    assert!(matches!(err, Error::IntentExtraction(_)));
    assert_eq!(llm.call_count(), 1);
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn test_hyde_failure_is_reported() {
    let llm = MockGenerationBackend::new()
        .with_script([r#"{"query_content": "topic"}"#])
        .with_failure("model overloaded");
    let embedder = MockEmbeddingBackend::new().with_dimension(2);
    let retrieval = RetrievalOrchestrator::new(
        QueryIntentAnalyzer::new(Arc::new(llm)),
        Arc::new(embedder.clone()),
        index().await,
    );
    let err = retrieval.smart_search("topic", 5).await.unwrap_err();
    assert!(matches!(err, Error::HydeGeneration(_)));
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn test_zero_k_rejected() {
    let (retrieval, llm, _) = orchestrator(r#"{"query_content": "x"}"#, index().await);
    assert!(matches!(
        retrieval.smart_search("x", 0).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_plain_search_uses_raw_query() {
    let index = index().await;
    let embedder = MockEmbeddingBackend::new()
        .with_dimension(2)
        .with_vector("molecules", vec![1.0, 0.0]);
    let retrieval = RetrievalOrchestrator::new(
        QueryIntentAnalyzer::new(Arc::new(MockGenerationBackend::new())),
        Arc::new(embedder),
        index,
    );
    let results = retrieval.search("molecules", 3).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|p| p.paper.id.as_str()).collect();
    assert_eq!(ids, vec!["p0", "p1", "p2"]);
}

#[tokio::test]
async fn test_recent_query_fetches_four_k_with_year_filter() {
    let index = Arc::new(RecordingIndex::new(index().await));
    let (retrieval, _, _) = orchestrator(
        r#"{"query_content": "transformer efficiency improvements", "year_start": 2022, "sort_by": "date"}"#,
        index.clone(),
    );

    let outcome = retrieval
        .smart_search("recent transformer efficiency improvements since 2022", 5)
        .await
        .unwrap();

    assert_eq!(
        index.searches(),
        vec![(20, Some(json!({"year": {"$gte": 2022}})))]
    );
    let years: Vec<i32> = outcome.results.iter().map(|p| p.paper.year).collect();
    assert_eq!(years, vec![2022, 2023, 2022, 2022, 2022]);
    assert_eq!(outcome.intent.sort_by, Some(SortBy::Date));
}
