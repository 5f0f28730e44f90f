//! # paperscope-search
//!
//! Multi-stage retrieval for paperscope.
//!
//! This crate provides:
//! - Query intent extraction into structured filters
//! - HyDE rewriting of the query topic into a hypothetical abstract
//! - Year filters pushed down to the paper index
//! - Over-fetching with author/category post-filters
//! - Cross-paper chunk ranking
//!
//! ## Example
//!
//! ```ignore
//! use paperscope_search::{QueryIntentAnalyzer, RetrievalOrchestrator};
//!
//! let analyzer = QueryIntentAnalyzer::new(generator);
//! let retrieval = RetrievalOrchestrator::new(analyzer, embedder, index);
//!
//! let outcome = retrieval
//!     .smart_search("graph neural networks for molecules since 2021", 5)
//!     .await?;
//! println!("{}", outcome.hyde_text);
//! ```

pub mod chunk_rank;
pub mod intent;
pub mod retrieval;

pub use chunk_rank::{merge_top, top_chunks, RankedChunk};
pub use intent::{
    extract_json_object, hyde_prompt, parse_intent, QueryIntentAnalyzer, INTENT_SYSTEM_PROMPT,
};
pub use retrieval::{
    build_index_filter, passes_post_filters, post_filter, RetrievalOrchestrator,
};
