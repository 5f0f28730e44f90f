//! # paperscope-core
//!
//! Core types, traits, and abstractions for paperscope.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other paperscope crates depend on.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::MetadataFilter;
pub use geometry::Region;
pub use models::*;
pub use traits::*;

/// Cosine similarity of two equal-length vectors.
///
/// Zero-norm inputs have similarity 0. Mismatched lengths compare the common prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
