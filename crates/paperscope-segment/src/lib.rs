//! # paperscope-segment
//!
//! Document segmentation for paperscope.
//!
//! This crate provides:
//! - Merging of nearby drawing rectangles into diagram regions
//! - Page snapshotting with noise filters (text, image and diagram passes)
//! - A pdfium-backed document loader (feature `pdfium`)
//! - Layout extraction with vision descriptions for figures
//! - Adaptive clustering of block embeddings
//! - The arXiv fetcher and the end-to-end paper chunking pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paperscope_segment::{ArxivSource, LayoutExtractor, PaperChunker, PdfiumLoader};
//!
//! let extractor = LayoutExtractor::new(Arc::new(PdfiumLoader::from_env()), vision);
//! let chunker = PaperChunker::new(Arc::new(ArxivSource::from_env()), extractor, embedder, chunks);
//! let blocks = chunker.chunk_paper("2401.01234").await?;
//! ```

pub mod cluster;
pub mod fetch;
pub mod layout;
pub mod page;
#[cfg(feature = "pdfium")]
pub mod pdfium;
#[cfg(not(feature = "pdfium"))]
mod pdfium_stub;
pub mod pipeline;
pub mod rect_merge;

pub use cluster::{adjacent_distances, AdaptiveClusterer};
pub use fetch::{validate_arxiv_id, ArxivSource, TempArtifact};
pub use layout::{LayoutExtractor, LayoutOptions, DIAGRAM_PROMPT, IMAGE_PROMPT};
pub use page::{
    collect_page_objects, flip_to_page_space, snapshot_document, snapshot_page, DocumentLoader,
    PageContent, PageObject, PageObjectKind, PageSnapshot, PageSource, RawImage, RawTextBlock,
    SnapshotOptions,
};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumLoader;
#[cfg(not(feature = "pdfium"))]
pub use pdfium_stub::PdfiumLoader;
pub use pipeline::PaperChunker;
pub use rect_merge::merge_regions;
