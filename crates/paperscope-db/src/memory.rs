//! In-memory brute-force index and chunk store.
//!
//! Used for local runs without PostgreSQL and as the index behind the
//! retrieval and API tests. Search is exact cosine similarity over every
//! stored vector, so results match the pgvector index up to ANN recall.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use paperscope_core::{
    cosine_similarity, ChunkHit, ChunkStore, IndexHit, MetadataFilter, PaperIndex, PaperRecord,
    Result, StoredChunk, Vector,
};

/// Paper index held in process memory.
#[derive(Default)]
pub struct InMemoryPaperIndex {
    // BTreeMap keeps tie-breaking between equal scores deterministic.
    papers: RwLock<BTreeMap<String, (PaperRecord, Vec<f32>)>>,
}

impl InMemoryPaperIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort by descending score; equal scores keep their existing order.
fn sort_descending<T>(items: &mut [(f32, T)]) {
    items.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
}

#[async_trait]
impl PaperIndex for InMemoryPaperIndex {
    async fn upsert(&self, papers: &[(PaperRecord, Vector)]) -> Result<()> {
        let mut guard = self.papers.write().await;
        for (paper, embedding) in papers {
            guard.insert(paper.id.clone(), (paper.clone(), embedding.to_vec()));
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &Vector,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        let guard = self.papers.read().await;
        let q = query.as_slice();
        let mut scored: Vec<(f32, &PaperRecord)> = guard
            .values()
            .filter(|(paper, _)| filter.map_or(true, |f| f.matches(paper)))
            .map(|(paper, embedding)| (cosine_similarity(q, embedding), paper))
            .collect();
        sort_descending(&mut scored);
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, paper)| IndexHit {
                paper: paper.clone(),
                score,
            })
            .collect())
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<PaperRecord>> {
        let guard = self.papers.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id).map(|(paper, _)| paper.clone()))
            .collect())
    }

    async fn update(&self, papers: &[PaperRecord]) -> Result<usize> {
        let mut guard = self.papers.write().await;
        let mut updated = 0;
        for paper in papers {
            if let Some(entry) = guard.get_mut(&paper.id) {
                entry.0 = paper.clone();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.papers.read().await.len())
    }
}

/// Chunk collections held in process memory.
#[derive(Default)]
pub struct InMemoryChunkStore {
    collections: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn replace_chunks(&self, paper_id: &str, chunks: &[StoredChunk]) -> Result<()> {
        self.collections
            .write()
            .await
            .insert(paper_id.to_string(), chunks.to_vec());
        Ok(())
    }

    async fn search_chunks(
        &self,
        paper_id: &str,
        query: &Vector,
        k: usize,
    ) -> Result<Vec<ChunkHit>> {
        let guard = self.collections.read().await;
        let Some(chunks) = guard.get(paper_id) else {
            return Ok(Vec::new());
        };
        let q = query.as_slice();
        let mut scored: Vec<(f32, &StoredChunk)> = chunks
            .iter()
            .map(|c| (cosine_similarity(q, c.embedding.as_slice()), c))
            .collect();
        sort_descending(&mut scored);
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, c)| ChunkHit {
                chunk_index: c.chunk_index,
                text: c.text.clone(),
                score,
            })
            .collect())
    }

    async fn chunk_count(&self, paper_id: &str) -> Result<usize> {
        Ok(self
            .collections
            .read()
            .await
            .get(paper_id)
            .map_or(0, |c| c.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, year: i32) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            abstract_text: String::new(),
            authors: String::new(),
            categories: "cs.LG".to_string(),
            year,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = InMemoryPaperIndex::new();
        index
            .upsert(&[
                (paper("a", 2020), Vector::from(vec![1.0, 0.0])),
                (paper("b", 2021), Vector::from(vec![0.7, 0.7])),
                (paper("c", 2022), Vector::from(vec![0.0, 1.0])),
            ])
            .await
            .unwrap();

        let hits = index
            .search(&Vector::from(vec![1.0, 0.1]), 2, None)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.paper.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_applies_filter() {
        let index = InMemoryPaperIndex::new();
        index
            .upsert(&[
                (paper("old", 2019), Vector::from(vec![1.0, 0.0])),
                (paper("new", 2023), Vector::from(vec![0.5, 0.5])),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::gte("year", 2020);
        let hits = index
            .search(&Vector::from(vec![1.0, 0.0]), 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.id, "new");
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_update_keeps_vector() {
        let index = InMemoryPaperIndex::new();
        index
            .upsert(&[(paper("a", 0), Vector::from(vec![1.0, 0.0]))])
            .await
            .unwrap();
        let updated = index
            .update(&[paper("a", 2021), paper("missing", 2021)])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(index.count().await.unwrap(), 1);
        let got = index.get(&["a".to_string()]).await.unwrap();
        assert_eq!(got[0].year, 2021);
    }

    #[tokio::test]
    async fn test_chunk_store_replace_and_search() {
        let store = InMemoryChunkStore::new();
        let chunk = |i: usize, v: Vec<f32>| StoredChunk {
            chunk_index: i,
            text: format!("chunk {}", i),
            embedding: Vector::from(v),
        };
        store
            .replace_chunks("p", &[chunk(0, vec![1.0, 0.0]), chunk(1, vec![0.0, 1.0])])
            .await
            .unwrap();
        store
            .replace_chunks("p", &[chunk(0, vec![0.0, 1.0]), chunk(1, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store
            .search_chunks("p", &Vector::from(vec![1.0, 0.0]), 1)
            .await
            .unwrap();
        assert_eq!(hits[0].chunk_index, 1);
        assert_eq!(store.chunk_count("p").await.unwrap(), 2);
        assert_eq!(store.chunk_count("unknown").await.unwrap(), 0);
    }
}
