//! paperscope-ingest: load the arXiv metadata snapshot into the paper index.
//!
//! Usage:
//!   paperscope-ingest --input arxiv-metadata-oai-snapshot.json
//!   paperscope-ingest --input snapshot.json --skip 111500 --min-year 2020 --limit 5000

use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use paperscope_api::ingest::{ingest, IngestOptions};
use paperscope_api::telemetry;
use paperscope_core::defaults::INGEST_BATCH_SIZE;
use paperscope_core::PaperIndex;
use paperscope_db::Database;
use paperscope_inference::InferenceConfig;

#[derive(Parser)]
#[command(name = "paperscope-ingest")]
#[command(author, version, about = "Embed arXiv metadata into the paperscope index")]
struct Cli {
    /// Metadata snapshot, one JSON object per line
    #[arg(short, long)]
    input: PathBuf,

    /// Lines to skip from the start of the file (resume an earlier run)
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Papers embedded and upserted per batch
    #[arg(short, long, default_value_t = INGEST_BATCH_SIZE)]
    batch_size: usize,

    /// Stop after storing this many papers
    #[arg(short, long)]
    limit: Option<usize>,

    /// Skip papers last updated before this year
    #[arg(long)]
    min_year: Option<i32>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/paperscope")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = telemetry::init_tracing("paperscope_api=info", "paperscope-ingest.log");
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    db.migrate().await?;
    let embedder = InferenceConfig::from_env()?.build_embedding_backend()?;
    let before = db.papers.count().await?;

    let file = tokio::fs::File::open(&cli.input).await?;
    let options = IngestOptions {
        skip: cli.skip,
        batch_size: cli.batch_size,
        limit: cli.limit,
        min_year: cli.min_year,
    };
    info!(input = %cli.input.display(), ?options, papers = before, "Starting ingestion");

    tokio::select! {
        result = ingest(BufReader::new(file), embedder.as_ref(), &db.papers, &options) => {
            let stats = result?;
            info!(
                upserted = stats.upserted,
                malformed = stats.malformed,
                filtered = stats.filtered,
                papers = db.papers.count().await?,
                "Ingestion finished"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            warn!(
                papers = db.papers.count().await?,
                "Interrupted; batches already upserted are kept"
            );
        }
    }
    Ok(())
}
