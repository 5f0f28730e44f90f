//! # paperscope-inference
//!
//! Embedding, generation and vision backends for paperscope.
//!
//! This crate provides:
//! - Ollama implementation of embeddings and generation (default)
//! - OpenAI-compatible implementation for hosted LLMs such as Groq (feature `openai`)
//! - Vision backend for describing figures and diagrams
//! - Environment-driven backend selection
//! - Deterministic mock backends (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use paperscope_inference::OllamaBackend;
//! use paperscope_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let texts = vec!["Sparse attention for long documents".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod config;
pub mod vision;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "ollama")]
pub use config::{InferenceBackendKind, InferenceConfig};
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};
pub use vision::{OllamaVisionBackend, VisionBackend};
