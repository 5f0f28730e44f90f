//! # paperscope-api
//!
//! HTTP surface and ingestion for paperscope.
//!
//! This crate provides:
//! - The axum router for search, paper segmentation and chunk chat
//! - The tool-using chat agent and its paper tools
//! - arXiv metadata ingestion (the `paperscope-ingest` binary)
//! - Environment configuration and tracing setup shared by the binaries

pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod router;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::{IndexBackend, ServerConfig};
pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, Collaborators};
