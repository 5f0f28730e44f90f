//! Inference configuration: selects which backend serves embeddings,
//! generation and vision, from environment variables.
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `PAPERSCOPE_LLM_BACKEND` | `ollama`, `openai` | `ollama` |
//! | `PAPERSCOPE_EMBED_BACKEND` | `ollama`, `openai` | `ollama` |
//! | `OLLAMA_VISION_MODEL` | model name, empty disables | unset |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use paperscope_core::{EmbeddingBackend, Error, GenerationBackend, Result};

use crate::ollama::OllamaBackend;
use crate::vision::{OllamaVisionBackend, VisionBackend};

/// Inference backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceBackendKind {
    #[default]
    Ollama,
    OpenAI,
}

impl FromStr for InferenceBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "groq" => Ok(Self::OpenAI),
            other => Err(Error::Config(format!("Invalid inference backend: {}", other))),
        }
    }
}

impl fmt::Display for InferenceBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Backend selection for each inference operation.
#[derive(Debug, Clone, Default)]
pub struct InferenceConfig {
    pub generation: InferenceBackendKind,
    pub embedding: InferenceBackendKind,
}

impl InferenceConfig {
    /// Load backend selection from the environment.
    pub fn from_env() -> Result<Self> {
        let generation = match std::env::var("PAPERSCOPE_LLM_BACKEND") {
            Ok(v) if !v.is_empty() => v.parse()?,
            _ => InferenceBackendKind::default(),
        };
        let embedding = match std::env::var("PAPERSCOPE_EMBED_BACKEND") {
            Ok(v) if !v.is_empty() => v.parse()?,
            _ => InferenceBackendKind::default(),
        };
        Ok(Self {
            generation,
            embedding,
        })
    }

    /// Construct the generation backend.
    pub fn build_generation_backend(&self) -> Result<Arc<dyn GenerationBackend>> {
        info!(backend = %self.generation, "Selecting generation backend");
        match self.generation {
            InferenceBackendKind::Ollama => Ok(Arc::new(OllamaBackend::from_env())),
            InferenceBackendKind::OpenAI => openai_generation(),
        }
    }

    /// Construct the embedding backend.
    pub fn build_embedding_backend(&self) -> Result<Arc<dyn EmbeddingBackend>> {
        info!(backend = %self.embedding, "Selecting embedding backend");
        match self.embedding {
            InferenceBackendKind::Ollama => Ok(Arc::new(OllamaBackend::from_env())),
            InferenceBackendKind::OpenAI => openai_embedding(),
        }
    }

    /// Construct the vision backend, if a vision model is configured.
    pub fn build_vision_backend(&self) -> Option<Arc<dyn VisionBackend>> {
        OllamaVisionBackend::from_env().map(|b| Arc::new(b) as Arc<dyn VisionBackend>)
    }
}

#[cfg(feature = "openai")]
fn openai_generation() -> Result<Arc<dyn GenerationBackend>> {
    Ok(Arc::new(crate::openai::OpenAIBackend::from_env()?))
}

#[cfg(feature = "openai")]
fn openai_embedding() -> Result<Arc<dyn EmbeddingBackend>> {
    Ok(Arc::new(crate::openai::OpenAIBackend::from_env()?))
}

#[cfg(not(feature = "openai"))]
fn openai_generation() -> Result<Arc<dyn GenerationBackend>> {
    Err(openai_disabled())
}

#[cfg(not(feature = "openai"))]
fn openai_embedding() -> Result<Arc<dyn EmbeddingBackend>> {
    Err(openai_disabled())
}

#[cfg(not(feature = "openai"))]
fn openai_disabled() -> Error {
    Error::Config(
        "OpenAI-compatible backend requested but the `openai` feature is disabled".to_string(),
    )
}
