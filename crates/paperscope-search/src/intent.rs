//! Query intent analysis and HyDE rewriting.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use paperscope_core::{Error, GenerationBackend, Result, SearchIntent};

/// System instruction for structured intent extraction.
pub const INTENT_SYSTEM_PROMPT: &str = r#"You are an expert at parsing academic search queries.
Extract filters (year, author, category) and the core topic from the user's query.
Answer with a single JSON object with exactly these keys:
  "query_content": the core semantic topic, stripped of filters (string)
  "year_start": first year to include, if mentioned (integer or null)
  "year_end": year before which results must fall, if mentioned (integer or null)
  "category": arXiv category code if mentioned, e.g. "cs.AI" or "math" (string or null)
  "author": a specific author name if mentioned (string or null)
  "sort_by": "relevance" or "date" (string or null)
If the user mentions "recent" or "newest", set sort_by to "date".
A broad field such as "math", "cs", "physics" or "stats" is a category code."#;

/// Build the HyDE instruction for a topic.
pub fn hyde_prompt(query_content: &str) -> String {
    format!(
        "Please write a short, scientific abstract (5-6 sentences) that would ideally \
         answer this question: \"{}\".\nDo not include any conversational text, just the abstract.",
        query_content
    )
}

/// Pull the JSON object out of a model answer.
///
/// Accepts a bare object, an object inside a Markdown code fence, or an
/// object surrounded by prose.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(fenced) => {
            let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
            fenced.rsplit_once("```").map_or(fenced, |(inner, _)| inner)
        }
        None => trimmed,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Parse a model answer into a [`SearchIntent`].
///
/// A blank `query_content` falls back to `original_query`.
pub fn parse_intent(raw: &str, original_query: &str) -> Result<SearchIntent> {
    let json = extract_json_object(raw).ok_or_else(|| {
        Error::IntentExtraction(format!("no JSON object in model output: {:.200}", raw))
    })?;
    let mut intent: SearchIntent = serde_json::from_str(json)
        .map_err(|e| Error::IntentExtraction(format!("malformed intent: {}", e)))?;
    if intent.query_content.trim().is_empty() {
        intent.query_content = original_query.to_string();
    } else {
        intent.query_content = intent.query_content.trim().to_string();
    }
    Ok(intent)
}

/// Turns free-text queries into structured intents and hypothetical abstracts.
#[derive(Clone)]
pub struct QueryIntentAnalyzer {
    generator: Arc<dyn GenerationBackend>,
}

impl QueryIntentAnalyzer {
    pub fn new(generator: Arc<dyn GenerationBackend>) -> Self {
        Self { generator }
    }

    /// Extract the structured intent of `query`.
    #[instrument(skip(self, query), fields(subsystem = "search", component = "intent", op = "analyze", prompt_len = query.len()))]
    pub async fn analyze(&self, query: &str) -> Result<SearchIntent> {
        let start = Instant::now();
        let raw = self
            .generator
            .generate_json_with_system(INTENT_SYSTEM_PROMPT, query)
            .await
            .map_err(|e| Error::IntentExtraction(e.to_string()))?;
        let intent = parse_intent(&raw, query)?;
        debug!(
            year_start = ?intent.year_start,
            year_end = ?intent.year_end,
            category = ?intent.category,
            author = ?intent.author,
            duration_ms = start.elapsed().as_millis() as u64,
            "Intent extracted"
        );
        Ok(intent)
    }

    /// Write a hypothetical abstract answering `query_content`.
    #[instrument(skip(self, query_content), fields(subsystem = "search", component = "intent", op = "hyde"))]
    pub async fn hyde(&self, query_content: &str) -> Result<String> {
        let start = Instant::now();
        let text = self
            .generator
            .generate(&hyde_prompt(query_content))
            .await
            .map_err(|e| Error::HydeGeneration(e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::HydeGeneration("model returned an empty abstract".to_string()));
        }
        debug!(
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "HyDE abstract generated"
        );
        Ok(text.to_string())
    }

    /// Run both steps: the intent, then the HyDE passage for its topic.
    pub async fn interpret(&self, query: &str) -> Result<(SearchIntent, String)> {
        let intent = self.analyze(query).await?;
        let hyde_text = self.hyde(&intent.query_content).await?;
        Ok((intent, hyde_text))
    }
}
