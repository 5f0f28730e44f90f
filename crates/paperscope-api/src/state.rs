//! Shared application state.

use std::sync::Arc;

use paperscope_core::{ChunkStore, DocumentSource, EmbeddingBackend, GenerationBackend, PaperIndex};
use paperscope_inference::VisionBackend;
use paperscope_search::{QueryIntentAnalyzer, RetrievalOrchestrator};
use paperscope_segment::{DocumentLoader, LayoutExtractor, LayoutOptions, PaperChunker};

use crate::config::ServerConfig;
use crate::services::{AgentTool, ChatAgent, SearchAllPapers, SearchPaperContent};

/// External collaborators, constructed once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn GenerationBackend>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub vision: Option<Arc<dyn VisionBackend>>,
    pub index: Arc<dyn PaperIndex>,
    pub chunks: Arc<dyn ChunkStore>,
    pub source: Arc<dyn DocumentSource>,
    pub loader: Arc<dyn DocumentLoader>,
}

#[derive(Clone)]
pub struct AppState {
    pub retrieval: RetrievalOrchestrator,
    pub chunker: PaperChunker,
    pub agent: ChatAgent,
}

impl AppState {
    pub fn new(c: Collaborators, config: &ServerConfig) -> Self {
        let retrieval = RetrievalOrchestrator::new(
            QueryIntentAnalyzer::new(c.generator.clone()),
            c.embedder.clone(),
            c.index.clone(),
        );

        let extractor = LayoutExtractor::new(c.loader, c.vision).with_options(LayoutOptions {
            page_concurrency: config.page_concurrency,
            vision_timeout: Some(config.vision_timeout),
            ..LayoutOptions::default()
        });
        let mut chunker =
            PaperChunker::new(c.source, extractor, c.embedder.clone(), c.chunks.clone());
        if let Some(dir) = &config.temp_dir {
            chunker = chunker.with_temp_dir(dir);
        }

        let tools: Vec<Arc<dyn AgentTool>> = vec![
            Arc::new(SearchPaperContent::new(c.embedder, c.chunks)),
            Arc::new(SearchAllPapers::new(retrieval.clone(), chunker.clone())),
        ];
        let agent =
            ChatAgent::new(c.generator, tools).with_max_iterations(config.agent_max_iterations);

        Self {
            retrieval,
            chunker,
            agent,
        }
    }
}
