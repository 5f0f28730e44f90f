//! PostgreSQL implementation of per-paper chunk collections.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use paperscope_core::{ChunkHit, ChunkStore, Error, Result, StoredChunk, Vector};

/// Chunk collections stored in the `paper_chunk` table, keyed by paper id.
#[derive(Clone)]
pub struct PgChunkStore {
    pool: PgPool,
}

impl PgChunkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for PgChunkStore {
    #[instrument(skip(self, paper_id, chunks), fields(subsystem = "db", component = "chunk_store", op = "replace_chunks", paper_id = %paper_id, chunk_count = chunks.len()))]
    async fn replace_chunks(&self, paper_id: &str, chunks: &[StoredChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM paper_chunk WHERE paper_id = $1")
            .bind(paper_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO paper_chunk (paper_id, chunk_index, text, embedding)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(paper_id)
            .bind(chunk.chunk_index as i32)
            .bind(&chunk.text)
            .bind(&chunk.embedding)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        debug!("Chunk collection replaced");
        Ok(())
    }

    #[instrument(skip(self, paper_id, query), fields(subsystem = "db", component = "chunk_store", op = "search_chunks", paper_id = %paper_id))]
    async fn search_chunks(
        &self,
        paper_id: &str,
        query: &Vector,
        k: usize,
    ) -> Result<Vec<ChunkHit>> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_index, text, 1.0 - (embedding <=> $2::vector) AS score
            FROM paper_chunk
            WHERE paper_id = $1
            ORDER BY embedding <=> $2::vector
            LIMIT $3
            "#,
        )
        .bind(paper_id)
        .bind(query)
        .bind(i64::try_from(k).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Index(format!("Chunk search failed: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| ChunkHit {
                chunk_index: row.get::<i32, _>("chunk_index") as usize,
                text: row.get("text"),
                score: row.get::<f64, _>("score") as f32,
            })
            .collect())
    }

    async fn chunk_count(&self, paper_id: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paper_chunk WHERE paper_id = $1")
            .bind(paper_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count as usize)
    }
}
