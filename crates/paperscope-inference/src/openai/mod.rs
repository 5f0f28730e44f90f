//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint speaking the OpenAI chat-completions protocol.
//! The default configuration targets Groq, which hosts the Llama models used
//! for intent extraction, HyDE and the chat agent.
//!
//! # Example
//!
//! ```rust,no_run
//! use paperscope_inference::openai::OpenAIBackend;
//! use paperscope_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let answer = backend.generate("Summarize attention in one line").await.unwrap();
//!     println!("{}", answer);
//! }
//! ```

mod backend;
mod types;

pub use backend::{
    OpenAIBackend, OpenAIConfig, DEFAULT_DIMENSION, DEFAULT_EMBED_MODEL, DEFAULT_GEN_MODEL,
    DEFAULT_OPENAI_URL,
};
pub use types::*;
