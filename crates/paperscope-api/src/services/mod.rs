//! Service layer for business logic.

pub mod chat_agent;
pub mod paper_tools;

pub use chat_agent::{
    AgentOutcome, AgentRun, AgentState, AgentStep, AgentTool, ChatAgent, ChatRequest, ChatTurn,
    ToolCall, ToolContext,
};
pub use paper_tools::{SearchAllPapers, SearchPaperContent};
