//! paperscope-api - HTTP API server for paperscope

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use paperscope_api::{build_router, telemetry, AppState, Collaborators, IndexBackend, ServerConfig};
use paperscope_core::{ChunkStore, EmbeddingBackend, GenerationBackend, PaperIndex};
use paperscope_db::{log_pool_metrics, Database, InMemoryChunkStore, InMemoryPaperIndex};
use paperscope_inference::InferenceConfig;
use paperscope_segment::{ArxivSource, PdfiumLoader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = telemetry::init_tracing(
        "paperscope_api=debug,paperscope_search=info,paperscope_segment=info,tower_http=debug",
        "paperscope-api.log",
    );

    let config = ServerConfig::from_env()?;

    let (index, chunks): (Arc<dyn PaperIndex>, Arc<dyn ChunkStore>) = match config.index_backend {
        IndexBackend::Postgres => {
            info!("Connecting to database...");
            let db = Database::connect(&config.database_url).await?;
            info!("Running database migrations...");
            db.migrate().await?;
            log_pool_metrics(db.pool());
            info!(papers = db.papers.count().await?, "Database ready");
            (Arc::new(db.papers.clone()), Arc::new(db.chunks.clone()))
        }
        IndexBackend::Memory => {
            warn!("Using in-memory index; papers are lost on restart");
            (
                Arc::new(InMemoryPaperIndex::new()),
                Arc::new(InMemoryChunkStore::new()),
            )
        }
    };

    let inference = InferenceConfig::from_env()?;
    let collaborators = Collaborators {
        generator: inference.build_generation_backend()?,
        embedder: inference.build_embedding_backend()?,
        vision: inference.build_vision_backend(),
        index,
        chunks,
        source: Arc::new(ArxivSource::from_env()),
        loader: Arc::new(PdfiumLoader::from_env()),
    };
    info!(
        embed_model = collaborators.embedder.model_name(),
        gen_model = collaborators.generator.model_name(),
        vision = collaborators.vision.is_some(),
        "Inference backends initialized"
    );

    let app = build_router(AppState::new(collaborators, &config));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
