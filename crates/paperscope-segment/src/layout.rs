//! Layout extraction: paged document to ordered, typed content blocks.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use paperscope_core::defaults::{
    DIAGRAM_BLOCK_PREFIX, DIAGRAM_RENDER_ZOOM, IMAGE_BLOCK_PREFIX, MIN_IMAGE_DESCRIPTION_CHARS,
    PAGE_CONCURRENCY,
};
use paperscope_core::{BlockKind, ContentBlock, Error, Result};
use paperscope_inference::VisionBackend;

use crate::page::{DocumentLoader, PageSnapshot, SnapshotOptions};

/// Prompt for embedded raster images.
pub const IMAGE_PROMPT: &str = "Describe this figure from a scientific paper. \
Explain what it shows, including any axes, labels, trends or key components.";

/// Prompt for rendered vector diagrams.
pub const DIAGRAM_PROMPT: &str = "Summarize this diagram from a scientific paper \
in at most 20 words. Name what it depicts, not its colors or style.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Pages described concurrently. Output order never depends on it.
    pub page_concurrency: usize,
    /// Upper bound for a single vision call.
    pub vision_timeout: Option<Duration>,
    pub render_zoom: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_concurrency: PAGE_CONCURRENCY,
            vision_timeout: None,
            render_zoom: DIAGRAM_RENDER_ZOOM,
        }
    }
}

/// Walks a document producing text, image and diagram blocks in reading order.
///
/// Without a vision backend only text blocks are produced.
#[derive(Clone)]
pub struct LayoutExtractor {
    loader: Arc<dyn DocumentLoader>,
    vision: Option<Arc<dyn VisionBackend>>,
    options: LayoutOptions,
}

impl LayoutExtractor {
    pub fn new(loader: Arc<dyn DocumentLoader>, vision: Option<Arc<dyn VisionBackend>>) -> Self {
        if vision.is_none() {
            info!("No vision backend configured; image and diagram passes disabled");
        }
        Self {
            loader,
            vision,
            options: LayoutOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Extract all blocks of the document at `path`.
    ///
    /// Blocks come out ordered by page, then by pass (text, image, diagram),
    /// then by discovery order. Per-block vision failures are logged and the
    /// block is dropped; document-level failures are returned.
    #[instrument(skip(self, path), fields(subsystem = "segment", component = "layout", op = "extract"))]
    pub async fn extract(&self, path: &Path) -> Result<Vec<ContentBlock>> {
        let start = Instant::now();
        let snapshot_options = SnapshotOptions {
            include_visuals: self.vision.is_some(),
            render_zoom: self.options.render_zoom,
        };

        let loader = self.loader.clone();
        let owned_path = path.to_path_buf();
        let snapshots = tokio::task::spawn_blocking(move || {
            loader.snapshot(&owned_path, &snapshot_options)
        })
        .await
        .map_err(|e| Error::Internal(format!("Document snapshot task failed: {}", e)))??;

        let page_count = snapshots.len();
        // `buffered` keeps page order regardless of which page finishes first.
        let pages: Vec<Vec<ContentBlock>> = stream::iter(snapshots)
            .map(|snapshot| self.describe_page(snapshot))
            .buffered(self.options.page_concurrency.max(1))
            .collect()
            .await;
        let blocks: Vec<ContentBlock> = pages.into_iter().flatten().collect();

        debug!(
            page_count,
            chunk_count = blocks.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Layout extraction complete"
        );
        Ok(blocks)
    }

    /// Turn one page snapshot into blocks: text, then images, then diagrams.
    async fn describe_page(&self, snapshot: PageSnapshot) -> Vec<ContentBlock> {
        let PageSnapshot {
            page,
            text_blocks,
            images,
            diagrams,
        } = snapshot;
        let mut blocks = text_blocks;

        let Some(vision) = self.vision.as_deref() else {
            return blocks;
        };

        for image in images {
            let description = match self
                .describe(vision, &image.bytes, &image.mime_type, IMAGE_PROMPT)
                .await
            {
                Ok(d) => d,
                Err(e) => {
                    warn!(page, error = %e, "Image description failed, skipping block");
                    continue;
                }
            };
            if description.chars().count() < MIN_IMAGE_DESCRIPTION_CHARS {
                warn!(page, "Image description too short, skipping block");
                continue;
            }
            blocks.push(ContentBlock {
                page,
                bbox: image.bbox,
                text: format!("{}{}", IMAGE_BLOCK_PREFIX, description),
                kind: BlockKind::Image,
            });
        }

        for diagram in diagrams {
            match self
                .describe(vision, &diagram.png, "image/png", DIAGRAM_PROMPT)
                .await
            {
                Ok(description) => blocks.push(ContentBlock {
                    page,
                    bbox: diagram.bbox,
                    text: format!("{}{}", DIAGRAM_BLOCK_PREFIX, description),
                    kind: BlockKind::Diagram,
                }),
                Err(e) => warn!(page, error = %e, "Diagram description failed, skipping block"),
            }
        }

        blocks
    }

    async fn describe(
        &self,
        vision: &dyn VisionBackend,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String> {
        let call = vision.describe_image(bytes, mime_type, Some(prompt));
        let description = match self.options.vision_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(format!("vision call exceeded {:?}", limit)))??,
            None => call.await?,
        };
        Ok(description.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use paperscope_core::Region;
    use paperscope_inference::mock::MockVisionBackend;

    use super::*;
    use crate::page::testing::*;
    use crate::page::PageContent;

    const LONG: &str = "A paragraph long enough to clear the noise filter for text blocks.";

    fn figure_page() -> PageContent {
        PageContent {
            text_blocks: vec![paragraph(LONG, 20.0), paragraph("tiny", 70.0)],
            images: vec![image(4096, 40.0), image(100, 300.0)],
            drawings: vec![Region::new(100.0, 550.0, 300.0, 700.0)],
            ..letter_page()
        }
    }

    fn extractor(pages: Vec<PageContent>, vision: Option<Arc<dyn VisionBackend>>) -> LayoutExtractor {
        let loader = FakeLoader(FakePages {
            pages,
            ..Default::default()
        });
        LayoutExtractor::new(Arc::new(loader), vision)
    }

    #[tokio::test]
    async fn test_pass_order_within_and_across_pages() {
        let vision = Arc::new(MockVisionBackend::new("  A bar chart comparing accuracy.  "));
        let ex = extractor(vec![figure_page(), figure_page()], Some(vision.clone()));

        let blocks = ex.extract(Path::new("paper.pdf")).await.unwrap();
        let shape: Vec<(u32, BlockKind)> = blocks.iter().map(|b| (b.page, b.kind)).collect();
        assert_eq!(
            shape,
            vec![
                (1, BlockKind::Text),
                (1, BlockKind::Image),
                (1, BlockKind::Diagram),
                (2, BlockKind::Text),
                (2, BlockKind::Image),
                (2, BlockKind::Diagram),
            ]
        );
        assert_eq!(blocks[1].text, "[IMAGE ANALYSIS] A bar chart comparing accuracy.");
        assert_eq!(blocks[2].text, "[DIAGRAM] A bar chart comparing accuracy.");
        assert_eq!(blocks[2].bbox, Region::new(100.0, 550.0, 300.0, 700.0));

        let prompts = vision.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts.contains(&IMAGE_PROMPT.to_string()));
        assert!(prompts.contains(&DIAGRAM_PROMPT.to_string()));
    }

    #[tokio::test]
    async fn test_short_image_description_is_dropped_but_diagram_kept() {
        let vision = Arc::new(MockVisionBackend::new("chart"));
        let ex = extractor(vec![figure_page()], Some(vision));

        let blocks = ex.extract(Path::new("paper.pdf")).await.unwrap();
        let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Text, BlockKind::Diagram]);
        assert_eq!(blocks[1].text, "[DIAGRAM] chart");
    }

    #[tokio::test]
    async fn test_vision_failure_keeps_text() {
        let ex = extractor(
            vec![figure_page()],
            Some(Arc::new(MockVisionBackend::failing())),
        );
        let blocks = ex.extract(Path::new("paper.pdf")).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Text);
    }

    #[tokio::test]
    async fn test_without_vision_only_text() {
        let ex = extractor(vec![figure_page()], None);
        let blocks = ex.extract(Path::new("paper.pdf")).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, LONG);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vision_timeout_skips_block() {
        let vision = MockVisionBackend::new("A detailed architecture diagram.")
            .with_delay(Duration::from_secs(30));
        let ex = extractor(vec![figure_page()], Some(Arc::new(vision))).with_options(LayoutOptions {
            vision_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let blocks = ex.extract(Path::new("paper.pdf")).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Text);
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_order() {
        let pages: Vec<PageContent> = (0..6).map(|_| figure_page()).collect();
        let vision: Arc<dyn VisionBackend> =
            Arc::new(MockVisionBackend::new("Plot of loss over training steps."));
        let sequential = extractor(pages.clone(), Some(vision.clone()))
            .with_options(LayoutOptions {
                page_concurrency: 1,
                ..Default::default()
            })
            .extract(Path::new("p.pdf"))
            .await
            .unwrap();
        let concurrent = extractor(pages, Some(vision))
            .with_options(LayoutOptions {
                page_concurrency: 6,
                ..Default::default()
            })
            .extract(Path::new("p.pdf"))
            .await
            .unwrap();
        assert_eq!(sequential, concurrent);
        let page_numbers: Vec<u32> = concurrent.iter().map(|b| b.page).collect();
        assert!(page_numbers.windows(2).all(|w| w[0] <= w[1]));
    }
}
