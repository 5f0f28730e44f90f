//! PostgreSQL + pgvector implementation of the paper index.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use paperscope_core::{
    Error, IndexHit, MetadataFilter, PaperIndex, PaperRecord, Result, Vector,
};

use crate::filter_sql::{MetadataFilterQueryBuilder, QueryParam};

/// Searches slower than this are logged as slow.
const SLOW_SEARCH_MS: u64 = 1_000;

/// pgvector's default and maximum `hnsw.ef_search`.
const MIN_EF_SEARCH: usize = 40;
const MAX_EF_SEARCH: usize = 1_000;

/// Paper index stored in the `paper` table.
#[derive(Clone)]
pub struct PgPaperIndex {
    pool: PgPool,
    /// Whether the installed pgvector supports `hnsw.iterative_scan`, checked once.
    iterative_scan: Arc<OnceCell<bool>>,
}

impl PgPaperIndex {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            iterative_scan: Arc::new(OnceCell::new()),
        }
    }

    async fn iterative_scan(&self) -> Result<bool> {
        self.iterative_scan
            .get_or_try_init(|| async {
                let version: Option<String> = sqlx::query_scalar(
                    "SELECT extversion FROM pg_extension WHERE extname = 'vector'",
                )
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
                let supported = version.as_deref().is_some_and(supports_iterative_scan);
                debug!(pgvector = ?version, iterative_scan = supported, "pgvector capabilities");
                Ok(supported)
            })
            .await
            .copied()
    }
}

/// HNSW candidate list size for a `k`-row search. An HNSW scan yields at most
/// `ef_search` rows before the WHERE clause is applied.
pub fn ef_search_for(k: usize) -> usize {
    k.clamp(MIN_EF_SEARCH, MAX_EF_SEARCH)
}

/// Iterative index scans (filtered searches that keep walking the graph
/// until enough rows pass) arrived in pgvector 0.8.0.
pub fn supports_iterative_scan(version: &str) -> bool {
    let mut parts = version
        .split('.')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= (0, 8)
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> PaperRecord {
    PaperRecord {
        id: row.get("id"),
        title: row.get("title"),
        abstract_text: row.get("abstract"),
        authors: row.get("authors"),
        categories: row.get("categories"),
        year: row.get("year"),
    }
}

#[async_trait]
impl PaperIndex for PgPaperIndex {
    #[instrument(skip(self, papers), fields(subsystem = "db", component = "paper_index", op = "upsert", input_count = papers.len()))]
    async fn upsert(&self, papers: &[(PaperRecord, Vector)]) -> Result<()> {
        if papers.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for (paper, embedding) in papers {
            sqlx::query(
                r#"
                INSERT INTO paper (id, title, abstract, authors, categories, year, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    abstract = EXCLUDED.abstract,
                    authors = EXCLUDED.authors,
                    categories = EXCLUDED.categories,
                    year = EXCLUDED.year,
                    embedding = EXCLUDED.embedding,
                    indexed_at = now()
                "#,
            )
            .bind(&paper.id)
            .bind(&paper.title)
            .bind(&paper.abstract_text)
            .bind(&paper.authors)
            .bind(&paper.categories)
            .bind(paper.year)
            .bind(embedding)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        debug!(result_count = papers.len(), "Papers upserted");
        Ok(())
    }

    #[instrument(skip(self, query, filter), fields(subsystem = "db", component = "paper_index", op = "search"))]
    async fn search(
        &self,
        query: &Vector,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        let start = Instant::now();
        let (clause, params) = match filter {
            Some(f) => MetadataFilterQueryBuilder::new(f, 2).build()?,
            None => ("TRUE".to_string(), Vec::new()),
        };

        // Relaxed-order iterative scans may return candidates slightly out of
        // order, so the outer query sorts the materialized rows again.
        let sql = format!(
            r#"
            WITH candidates AS MATERIALIZED (
                SELECT p.id, p.title, p.abstract, p.authors, p.categories, p.year,
                       p.embedding <=> $1::vector AS distance
                FROM paper p
                WHERE {}
                ORDER BY distance
                LIMIT $2
            )
            SELECT id, title, abstract, authors, categories, year, 1.0 - distance AS score
            FROM candidates
            ORDER BY distance
            "#,
            clause
        );

        let limit = i64::try_from(k).unwrap_or(i64::MAX);
        let mut query_builder = sqlx::query(&sql).bind(query).bind(limit);
        for param in params {
            query_builder = match param {
                QueryParam::BigInt(v) => query_builder.bind(v),
            };
        }

        let iterative_scan = self.iterative_scan().await?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        // Settings are transaction-local and reset on commit.
        sqlx::query("SELECT set_config('hnsw.ef_search', $1, true)")
            .bind(ef_search_for(k).to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Index(format!("Failed to size HNSW scan: {}", e)))?;
        if iterative_scan && filter.is_some() {
            sqlx::query("SELECT set_config('hnsw.iterative_scan', 'relaxed_order', true)")
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Index(format!("Failed to enable iterative scan: {}", e)))?;
        }

        let rows = query_builder
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| Error::Index(format!("Paper search failed: {}", e)))?;
        tx.commit().await.map_err(Error::Database)?;

        let hits: Vec<IndexHit> = rows
            .iter()
            .map(|row| IndexHit {
                paper: record_from_row(row),
                score: row.get::<f64, _>("score") as f32,
            })
            .collect();

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(result_count = hits.len(), duration_ms = elapsed, "Paper search complete");
        if elapsed > SLOW_SEARCH_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow paper search");
        }
        Ok(hits)
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<PaperRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.title, p.abstract, p.authors, p.categories, p.year
            FROM paper p
            WHERE p.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    #[instrument(skip(self, papers), fields(subsystem = "db", component = "paper_index", op = "update", input_count = papers.len()))]
    async fn update(&self, papers: &[PaperRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut updated = 0usize;
        for paper in papers {
            let result = sqlx::query(
                r#"
                UPDATE paper
                SET title = $2, abstract = $3, authors = $4, categories = $5, year = $6
                WHERE id = $1
                "#,
            )
            .bind(&paper.id)
            .bind(&paper.title)
            .bind(&paper.abstract_text)
            .bind(&paper.authors)
            .bind(&paper.categories)
            .bind(paper.year)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            updated += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(updated)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paper")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count as usize)
    }
}
