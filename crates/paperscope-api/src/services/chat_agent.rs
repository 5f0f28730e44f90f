//! Tool-using chat agent for questions about a focused paper chunk.
//!
//! The agent is an explicit state machine:
//!
//! ```text
//! AwaitingModel --decision: tool--> ExecutingTool --observation--> AwaitingModel
//! AwaitingModel --decision: final_answer / unparseable--> Done
//! ```
//!
//! Every transition into `AwaitingModel` costs one model turn. The run stops
//! with the fallback answer once the turn budget is spent.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, instrument, warn};

use paperscope_core::defaults::{AGENT_FALLBACK_ANSWER, AGENT_MAX_ITERATIONS};
use paperscope_core::{GenerationBackend, Result};
use paperscope_search::extract_json_object;

/// Per-request values a tool may need.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub arxiv_id: String,
}

/// A capability the agent can invoke by name.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line usage shown to the model, including the input keys.
    fn description(&self) -> &'static str;

    async fn call(&self, input: &JsonValue, ctx: &ToolContext) -> Result<String>;
}

/// One earlier message of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Chunk the user was focused on when sending this message.
    #[serde(rename = "chunkId", default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<JsonValue>,
}

fn default_role() -> String {
    "user".to_string()
}

/// A question about one chunk of a paper.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub arxiv_id: String,
    pub chunk_id: Option<JsonValue>,
    pub chunk_text: String,
    pub question: String,
    pub history: Vec<ChatTurn>,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub input: JsonValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    AwaitingModel,
    ExecutingTool(ToolCall),
    Done(String),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentOutcome {
    Answered,
    IterationLimit,
    ModelError,
}

/// An executed tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub input: JsonValue,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    pub outcome: AgentOutcome,
    /// Model turns used.
    pub iterations: usize,
}

#[derive(Deserialize)]
struct Decision {
    action: String,
    #[serde(default)]
    input: JsonValue,
    #[serde(default)]
    answer: Option<JsonValue>,
}

/// Interpret a model turn. Anything that is not a decision object is the answer itself.
pub fn parse_decision(raw: &str) -> AgentState {
    let decision = extract_json_object(raw)
        .and_then(|json| serde_json::from_str::<Decision>(json).ok())
        .filter(|d| !d.action.trim().is_empty());

    match decision {
        Some(d) if d.action == "final_answer" => {
            let answer = d.answer.or_else(|| d.input.get("answer").cloned());
            AgentState::Done(match answer {
                Some(JsonValue::String(s)) => s,
                Some(other) => other.to_string(),
                None => raw.trim().to_string(),
            })
        }
        Some(d) => AgentState::ExecutingTool(ToolCall {
            tool: d.action,
            input: d.input,
        }),
        None => AgentState::Done(raw.trim().to_string()),
    }
}

/// Display form of a chunk id: strings bare, anything else as JSON.
fn chunk_label(id: Option<&JsonValue>) -> String {
    match id {
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}

/// Chat agent over a paper's chunks and the wider index.
#[derive(Clone)]
pub struct ChatAgent {
    generator: Arc<dyn GenerationBackend>,
    tools: Vec<Arc<dyn AgentTool>>,
    max_iterations: usize,
}

impl ChatAgent {
    pub fn new(generator: Arc<dyn GenerationBackend>, tools: Vec<Arc<dyn AgentTool>>) -> Self {
        Self {
            generator,
            tools,
            max_iterations: AGENT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// System protocol for one request.
    pub fn system_prompt(&self, request: &ChatRequest) -> String {
        let tool_lines: Vec<String> = self
            .tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect();

        format!(
            r#"You are an expert research assistant.
The user is navigating a paper and has just clicked on a SPECIFIC SEGMENT to focus on.

--- CURRENT CHUNK with ID: {chunk_id} and TEXT:
{chunk_text}
-------------------------------------------------------

PROTOCOL:
1. DIAGRAM/IMAGE HANDLING: if the current chunk starts with `[DIAGRAM]` or `[IMAGE ANALYSIS]`,
   it is a transcription of the visual content. Treat it as ground truth and answer from it.
   Do not use tools to look for the image or its caption.
2. SEARCH RULES: check the current chunk first; if the answer is there, just answer.
   Only use `search_paper_content` when the answer needs ideas from other parts of the paper.
   Only use `search_all_papers` when the user asks about other papers or external comparisons.
3. ARGUMENTS: for `search_paper_content` always pass "arxiv_id": "{arxiv_id}".
   For `search_all_papers` pass the query only. Keep queries short: keywords, at most two sentences.

TOOLS:
{tools}

Reply with exactly one JSON object and nothing else, either
{{"action": "<tool name>", "input": {{...}}}}
or
{{"action": "final_answer", "answer": "<your answer to the user>"}}"#,
            chunk_id = chunk_label(request.chunk_id.as_ref()),
            chunk_text = request.chunk_text,
            arxiv_id = request.arxiv_id,
            tools = tool_lines.join("\n"),
        )
    }

    /// Conversation so far: history, the question, then tool observations.
    pub fn transcript(&self, request: &ChatRequest, steps: &[AgentStep]) -> String {
        let mut out = String::new();
        for turn in &request.history {
            match turn.role.as_str() {
                "ai" | "assistant" => {
                    out.push_str("Assistant: ");
                    out.push_str(&turn.content);
                }
                _ => {
                    out.push_str("User: ");
                    if turn.chunk_id.is_some() {
                        out.push_str(&format!("[Chunk {}] ", chunk_label(turn.chunk_id.as_ref())));
                    }
                    out.push_str(&turn.content);
                }
            }
            out.push('\n');
        }
        out.push_str("User: ");
        out.push_str(&request.question);
        out.push('\n');

        for step in steps {
            out.push_str(&format!(
                "\nAction: {} {}\nObservation: {}\n",
                step.tool, step.input, step.observation
            ));
        }
        out
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.tool) else {
            let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
            warn!(tool = %call.tool, "Model requested unknown tool");
            return format!(
                "Unknown tool '{}'. Available tools: {}",
                call.tool,
                names.join(", ")
            );
        };
        match tool.call(&call.input, ctx).await {
            Ok(observation) => observation,
            Err(e) => {
                warn!(tool = %call.tool, error = %e, "Tool call failed");
                format!("Error searching paper: {}", e)
            }
        }
    }

    /// Answer `request`, driving the state machine until it is done or the
    /// turn budget runs out.
    #[instrument(skip(self, request), fields(subsystem = "api", component = "agent", op = "run", paper_id = %request.arxiv_id))]
    pub async fn run(&self, request: &ChatRequest) -> AgentRun {
        let start = Instant::now();
        let system = self.system_prompt(request);
        let ctx = ToolContext {
            arxiv_id: request.arxiv_id.clone(),
        };

        let mut steps: Vec<AgentStep> = Vec::new();
        let mut iterations = 0;
        let mut state = AgentState::AwaitingModel;

        let (answer, outcome) = loop {
            state = match state {
                AgentState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        warn!(iterations, "Agent reached iteration limit");
                        break (AGENT_FALLBACK_ANSWER.to_string(), AgentOutcome::IterationLimit);
                    }
                    iterations += 1;
                    let prompt = self.transcript(request, &steps);
                    match self
                        .generator
                        .generate_json_with_system(&system, &prompt)
                        .await
                    {
                        Ok(raw) => parse_decision(&raw),
                        Err(e) => {
                            error!(error = %e, iterations, "Agent model call failed");
                            break (AGENT_FALLBACK_ANSWER.to_string(), AgentOutcome::ModelError);
                        }
                    }
                }
                AgentState::ExecutingTool(call) => {
                    debug!(tool = %call.tool, input = %call.input, "Executing tool");
                    let observation = self.execute(&call, &ctx).await;
                    steps.push(AgentStep {
                        tool: call.tool,
                        input: call.input,
                        observation,
                    });
                    AgentState::AwaitingModel
                }
                AgentState::Done(answer) => break (answer, AgentOutcome::Answered),
            };
        };

        info!(
            iterations,
            tool_calls = steps.len(),
            outcome = ?outcome,
            duration_ms = start.elapsed().as_millis() as u64,
            "Agent run finished"
        );
        AgentRun {
            answer,
            steps,
            outcome,
            iterations,
        }
    }
}
