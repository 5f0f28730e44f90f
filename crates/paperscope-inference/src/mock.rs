//! Mock inference backends for deterministic testing.
//!
//! Available inside this crate's tests and to other crates through the
//! `mock` feature:
//!
//! ```toml
//! [dev-dependencies]
//! paperscope-inference = { workspace = true, features = ["mock"] }
//! ```
//!
//! ```rust,ignore
//! use paperscope_inference::mock::{MockEmbeddingBackend, MockGenerationBackend};
//! use paperscope_core::{EmbeddingBackend, GenerationBackend};
//!
//! let embedder = MockEmbeddingBackend::new().with_dimension(8);
//! let v = embedder.embed_text("attention").await.unwrap();
//! assert_eq!(v.as_slice().len(), 8);
//!
//! let llm = MockGenerationBackend::new().with_script(["first", "second"]);
//! assert_eq!(llm.generate("a").await.unwrap(), "first");
//! assert_eq!(llm.generate("b").await.unwrap(), "second");
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use paperscope_core::{EmbeddingBackend, Error, GenerationBackend, Result, Vector};

use crate::vision::VisionBackend;

// =============================================================================
// EMBEDDINGS
// =============================================================================

/// Deterministic embedding backend.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    overrides: Arc<HashMap<String, Vec<f32>>>,
    fail: bool,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockEmbeddingBackend {
    pub fn new() -> Self {
        Self {
            dimension: paperscope_core::defaults::EMBED_DIMENSION,
            overrides: Arc::new(HashMap::new()),
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Arc::make_mut(&mut self.overrides).insert(text.into(), vector);
        self
    }

    /// Make every call fail with an embedding error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Batches passed to `embed_texts`, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.calls.lock().unwrap().push(texts.to_vec());
        if self.fail {
            return Err(Error::Embedding("Simulated embedding failure".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| {
                self.overrides
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| MockEmbeddingGenerator::generate(t, self.dimension))
            })
            .map(Vector::from)
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic unit vector from text.
    ///
    /// Uses character-based hashing, so the same text always produces the
    /// same embedding and texts sharing characters are similar.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension.max(1)];

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % vec.len();
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// One recorded generation call.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub system: String,
    pub prompt: String,
    pub json: bool,
}

/// Scripted generation backend.
///
/// Responses are chosen in this order: the first prompt rule whose needle
/// occurs in the prompt, then the next scripted response, then the default.
#[derive(Clone)]
pub struct MockGenerationBackend {
    script: Arc<Mutex<VecDeque<Result<String>>>>,
    rules: Arc<Vec<(String, String)>>,
    default_response: String,
    calls: Arc<Mutex<Vec<GenerationCall>>>,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            rules: Arc::new(Vec::new()),
            default_response: "Mock response".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue responses returned one per call.
    pub fn with_script<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut script = self.script.lock().unwrap();
            script.extend(responses.into_iter().map(|r| Ok(r.into())));
        }
        self
    }

    /// Queue a failure for the next unanswered call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::Inference(message.into())));
        self
    }

    /// Answer `response` whenever the prompt contains `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.rules).push((needle.into(), response.into()));
        self
    }

    /// Response used once the script is exhausted.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, system: &str, prompt: &str, json: bool) -> Result<String> {
        self.calls.lock().unwrap().push(GenerationCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            json,
        });
        if let Some((_, response)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle))
        {
            return Ok(response.clone());
        }
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        Ok(self.default_response.clone())
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond("", prompt, false)
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.respond(system, prompt, false)
    }

    async fn generate_json_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.respond(system, prompt, true)
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

// =============================================================================
// VISION
// =============================================================================

/// Vision backend returning a fixed description, or failing.
#[derive(Clone)]
pub struct MockVisionBackend {
    response: Option<String>,
    delay: Option<std::time::Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockVisionBackend {
    /// Backend answering every request with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend failing every request.
    pub fn failing() -> Self {
        Self {
            response: None,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep before answering, for timeout tests.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn describe_image(
        &self,
        _image_data: &[u8],
        _mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(prompt.unwrap_or_default().to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .ok_or_else(|| Error::Vision("Simulated vision failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
