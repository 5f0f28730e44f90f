//! # paperscope-db
//!
//! Vector index layer for paperscope.
//!
//! This crate provides:
//! - Connection pool management
//! - pgvector-backed paper index with metadata filter push-down
//! - Per-paper chunk collections
//! - In-memory implementations of both for local runs and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use paperscope_db::Database;
//! use paperscope_core::PaperIndex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/paperscope").await?;
//!     println!("{} papers indexed", db.papers.count().await?);
//!     Ok(())
//! }
//! ```

pub mod chunks;
pub mod filter_sql;
pub mod memory;
pub mod papers;
pub mod pool;

pub use chunks::PgChunkStore;
pub use memory::{InMemoryChunkStore, InMemoryPaperIndex};
pub use papers::PgPaperIndex;
pub use pool::{create_pool, log_pool_metrics, PoolConfig};

#[cfg(feature = "migrations")]
use paperscope_core::Error;
use paperscope_core::Result;

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub papers: PgPaperIndex,
    pub chunks: PgChunkStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            papers: PgPaperIndex::new(pool.clone()),
            chunks: PgChunkStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect with pool settings from the environment.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url, PoolConfig::from_env()).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
