//! Centralized default constants for paperscope.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// LAYOUT EXTRACTION
// =============================================================================

/// Text blocks whose raw text is shorter than this are treated as noise
/// (page numbers, running headers, captions).
pub const MIN_TEXT_BLOCK_CHARS: usize = 50;

/// Embedded images whose encoded bytes are fewer than this are skipped
/// (icons, bullets, logos).
pub const MIN_IMAGE_BYTES: usize = 2000;

/// Image descriptions shorter than this (after trimming) are discarded.
pub const MIN_IMAGE_DESCRIPTION_CHARS: usize = 10;

/// Drawing primitives narrower or shorter than this are dropped before merging.
pub const MIN_DRAWING_SIDE: f32 = 5.0;

/// Drawing primitives covering more than this fraction of the page are
/// treated as page frames and dropped.
pub const MAX_DRAWING_PAGE_FRACTION: f32 = 0.9;

/// Padding used when merging nearby drawing primitives into diagram regions.
pub const DIAGRAM_MERGE_PADDING: f32 = 50.0;

/// Merged diagram regions narrower or shorter than this are dropped.
pub const MIN_DIAGRAM_SIDE: f32 = 100.0;

/// Zoom factor used when rasterizing diagram regions for the vision model.
pub const DIAGRAM_RENDER_ZOOM: f32 = 2.0;

/// Text prefix of blocks produced from embedded images.
pub const IMAGE_BLOCK_PREFIX: &str = "[IMAGE ANALYSIS] ";

/// Text prefix of blocks produced from vector diagrams.
pub const DIAGRAM_BLOCK_PREFIX: &str = "[DIAGRAM] ";

/// Pages described concurrently by the layout extractor.
pub const PAGE_CONCURRENCY: usize = 4;

// =============================================================================
// CLUSTERING
// =============================================================================

/// Multiplier of the standard deviation added to the mean adjacent distance.
pub const CLUSTER_SIGMA_FACTOR: f32 = 0.5;

/// Threshold used when a document has fewer than two blocks.
pub const CLUSTER_FALLBACK_THRESHOLD: f32 = 0.5;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Candidates requested from the index per requested result.
pub const OVERFETCH_FACTOR: usize = 4;

/// Default result count for plain similarity search.
pub const SEARCH_K: usize = 5;

/// Metadata field carrying the publication year.
pub const YEAR_FIELD: &str = "year";

// =============================================================================
// CHAT AGENT
// =============================================================================

/// Maximum model turns per chat request.
pub const AGENT_MAX_ITERATIONS: usize = 20;

/// Chunks returned by the per-paper content search tool.
pub const PAPER_TOOL_K: usize = 3;

/// Papers consulted by the cross-paper search tool.
pub const CROSS_PAPER_PAPERS: usize = 3;

/// Best chunks kept per paper by the cross-paper search tool.
pub const CROSS_PAPER_CHUNKS_PER_PAPER: usize = 5;

/// Chunks returned by the cross-paper search tool after merging.
pub const CROSS_PAPER_TOP_K: usize = 5;

/// Answer returned when the agent cannot finish.
pub const AGENT_FALLBACK_ANSWER: &str = "Something went wrong";

// =============================================================================
// INGESTION
// =============================================================================

/// Records embedded and upserted per batch.
pub const INGEST_BATCH_SIZE: usize = 500;

/// Maximum characters of the author list stored per paper.
pub const AUTHORS_MAX_CHARS: usize = 200;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 5000;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name (Ollama build of all-MiniLM-L6-v2).
pub const EMBED_MODEL: &str = "all-minilm";

/// Default embedding vector dimension for all-minilm.
pub const EMBED_DIMENSION: usize = 384;

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "llama3.3:70b";

/// Default generation model for OpenAI-compatible endpoints (Groq).
pub const OPENAI_GEN_MODEL: &str = "llama-3.3-70b-versatile";

/// Default OpenAI-compatible base URL (Groq).
pub const OPENAI_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Timeout for a single vision description in seconds.
pub const VISION_TIMEOUT_SECS: u64 = 120;

/// Environment variable for the vision model name.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

/// Default vision model for image and diagram description.
pub const DEFAULT_OLLAMA_VISION_MODEL: &str = "llama3.2-vision";

/// Embedding calls slower than this are logged as slow.
pub const SLOW_EMBED_MS: u64 = 5_000;

/// Generation calls slower than this are logged as slow.
pub const SLOW_GEN_MS: u64 = 30_000;

// =============================================================================
// DOCUMENT SOURCE
// =============================================================================

/// Base URL PDFs are fetched from; the paper id and `.pdf` are appended.
pub const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf";

/// Timeout for a single PDF download in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 60;
