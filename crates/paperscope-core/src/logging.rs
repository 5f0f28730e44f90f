//! Structured logging schema and field name constants for paperscope.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same field names in every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, block skipped or fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (hits, blocks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference", "segment", "ingest"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "intent", "retrieval", "ollama", "pool", "layout", "agent"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "smart_search", "embed_texts", "generate", "chunk_paper"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Paper identifier (arXiv id) being operated on.
pub const PAPER_ID: &str = "paper_id";

/// 1-based page number within a document.
pub const PAGE: &str = "page";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks or blocks processed.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of clusters produced for a document.
pub const CLUSTER_COUNT: &str = "cluster_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Retrieval fields ──────────────────────────────────────────────────────

/// Number of candidates requested from the index before post-filtering.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of candidates rejected by post-filters.
pub const FILTERED_OUT: &str = "filtered_out";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: &[&str] = &[
        REQUEST_ID,
        SUBSYSTEM,
        COMPONENT,
        OPERATION,
        PAPER_ID,
        PAGE,
        QUERY,
        DURATION_MS,
        RESULT_COUNT,
        CHUNK_COUNT,
        CLUSTER_COUNT,
        INPUT_COUNT,
        PROMPT_LEN,
        RESPONSE_LEN,
        CANDIDATE_COUNT,
        FILTERED_OUT,
        POOL_SIZE,
        POOL_IDLE,
        DB_TABLE,
        MODEL,
        SUCCESS,
        ERROR_MSG,
        SLOW,
    ];

    #[test]
    fn test_field_names_unique_and_snake_case() {
        let unique: HashSet<_> = ALL.iter().collect();
        assert_eq!(unique.len(), ALL.len());
        for name in ALL {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
