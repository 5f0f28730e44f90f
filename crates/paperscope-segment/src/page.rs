//! Page model and synchronous page snapshotting.
//!
//! A [`PageSource`] exposes the native layout of one opened document: text
//! blocks, embedded raster images and vector drawing primitives per page, plus
//! region rendering. [`snapshot_document`] walks every page and applies the
//! noise filters, producing [`PageSnapshot`]s that carry everything the async
//! description stage needs. All of this is blocking work and runs on the
//! blocking pool.

use std::path::Path;

use tracing::{debug, warn};

use paperscope_core::defaults::{
    DIAGRAM_MERGE_PADDING, DIAGRAM_RENDER_ZOOM, MAX_DRAWING_PAGE_FRACTION, MIN_DIAGRAM_SIDE,
    MIN_DRAWING_SIDE, MIN_IMAGE_BYTES, MIN_TEXT_BLOCK_CHARS,
};
use paperscope_core::{BlockKind, ContentBlock, Region, Result};

use crate::rect_merge::merge_regions;

/// A paragraph-level text block as reported by the document layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTextBlock {
    pub bbox: Region,
    pub text: String,
    /// False for non-text layout blocks (image placeholders and the like).
    pub is_text: bool,
}

/// An embedded raster image with its placement rectangles on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub placements: Vec<Region>,
}

/// Native layout of a single page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub width: f32,
    pub height: f32,
    pub text_blocks: Vec<RawTextBlock>,
    pub images: Vec<RawImage>,
    /// Bounding rectangles of vector drawing primitives.
    pub drawings: Vec<Region>,
}

/// A page object as the document reports it.
///
/// `bounds` are in the coordinate space of the parent: PDF space (origin
/// bottom-left) for top-level objects, form space for objects nested in a
/// form XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct PageObject {
    pub bounds: Region,
    pub kind: PageObjectKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageObjectKind {
    /// Decoded raster image, encoded as `mime_type`.
    Image { bytes: Vec<u8>, mime_type: String },
    Path,
    /// Form XObject (an embedded PDF or EPS figure) with its own objects.
    Form(Vec<PageObject>),
    /// Text and anything else; only contributes to its parent's extent.
    Other,
}

/// Axis-aligned map `x' = sx * x + tx`, `y' = sy * y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisTransform {
    sx: f32,
    sy: f32,
    tx: f32,
    ty: f32,
}

impl AxisTransform {
    const IDENTITY: AxisTransform = AxisTransform {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Map taking `content` onto `target`.
    fn fitting(content: &Region, target: &Region) -> Self {
        let sx = if content.width() > 0.0 {
            target.width() / content.width()
        } else {
            1.0
        };
        let sy = if content.height() > 0.0 {
            target.height() / content.height()
        } else {
            1.0
        };
        Self {
            sx,
            sy,
            tx: target.x0 - sx * content.x0,
            ty: target.y0 - sy * content.y0,
        }
    }

    /// `self` followed by `outer`.
    fn then(&self, outer: &AxisTransform) -> Self {
        Self {
            sx: outer.sx * self.sx,
            sy: outer.sy * self.sy,
            tx: outer.sx * self.tx + outer.tx,
            ty: outer.sy * self.ty + outer.ty,
        }
    }

    fn apply(&self, r: &Region) -> Region {
        Region::new(
            self.sx * r.x0 + self.tx,
            self.sy * r.y0 + self.ty,
            self.sx * r.x1 + self.tx,
            self.sy * r.y1 + self.ty,
        )
    }
}

/// Convert a PDF-space rectangle (origin bottom-left) to page space (origin top-left).
pub fn flip_to_page_space(r: &Region, page_height: f32) -> Region {
    Region::new(r.x0, page_height - r.y1, r.x1, page_height - r.y0)
}

/// Embedded images and drawing primitives of a page, in page space.
///
/// Form XObjects are descended into. A form's bounds are the transformed
/// extent of its objects, so each form's content is fitted onto its bounds.
/// Identical images drawn several times yield one [`RawImage`] listing every
/// placement in drawing order.
pub fn collect_page_objects(
    objects: &[PageObject],
    page_height: f32,
) -> (Vec<RawImage>, Vec<Region>) {
    let mut images = Vec::new();
    let mut drawings = Vec::new();
    walk_objects(
        objects,
        &AxisTransform::IDENTITY,
        page_height,
        &mut images,
        &mut drawings,
    );
    (images, drawings)
}

fn walk_objects(
    objects: &[PageObject],
    transform: &AxisTransform,
    page_height: f32,
    images: &mut Vec<RawImage>,
    drawings: &mut Vec<Region>,
) {
    for object in objects {
        match &object.kind {
            PageObjectKind::Image { bytes, mime_type } => {
                let bbox = flip_to_page_space(&transform.apply(&object.bounds), page_height);
                match images.iter_mut().find(|img| img.bytes == *bytes) {
                    Some(existing) => existing.placements.push(bbox),
                    None => images.push(RawImage {
                        bytes: bytes.clone(),
                        mime_type: mime_type.clone(),
                        placements: vec![bbox],
                    }),
                }
            }
            PageObjectKind::Path => {
                drawings.push(flip_to_page_space(
                    &transform.apply(&object.bounds),
                    page_height,
                ));
            }
            PageObjectKind::Form(children) => {
                let Some(content) = children
                    .iter()
                    .map(|c| c.bounds)
                    .reduce(|a, b| a.union(&b))
                else {
                    continue;
                };
                let inner = AxisTransform::fitting(&content, &object.bounds).then(transform);
                walk_objects(children, &inner, page_height, images, drawings);
            }
            PageObjectKind::Other => {}
        }
    }
}

/// Synchronous access to the pages of an opened document.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Layout of the page at 0-based `index`.
    fn page(&self, index: usize) -> Result<PageContent>;

    /// Render `region` of the page at `index` to PNG bytes at `zoom`.
    fn render_region(&self, index: usize, region: &Region, zoom: f32) -> Result<Vec<u8>>;
}

/// Image that passed the size filter and awaits description.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub bbox: Region,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Rendered diagram region awaiting description.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramCandidate {
    pub bbox: Region,
    pub png: Vec<u8>,
}

/// Filtered content of one page, ready for description.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    /// 1-based page number.
    pub page: u32,
    pub text_blocks: Vec<ContentBlock>,
    pub images: Vec<ImageCandidate>,
    pub diagrams: Vec<DiagramCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotOptions {
    /// Collect image and diagram candidates. Off when no vision backend is available.
    pub include_visuals: bool,
    pub render_zoom: f32,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            include_visuals: true,
            render_zoom: DIAGRAM_RENDER_ZOOM,
        }
    }
}

/// Opens documents and snapshots them. Implementations are blocking.
pub trait DocumentLoader: Send + Sync {
    fn snapshot(&self, path: &Path, options: &SnapshotOptions) -> Result<Vec<PageSnapshot>>;
}

/// Keep text blocks of at least [`MIN_TEXT_BLOCK_CHARS`] raw characters,
/// flattening line breaks.
pub fn text_blocks(page: u32, blocks: &[RawTextBlock]) -> Vec<ContentBlock> {
    blocks
        .iter()
        .filter(|b| b.is_text && b.text.chars().count() >= MIN_TEXT_BLOCK_CHARS)
        .map(|b| ContentBlock {
            page,
            bbox: b.bbox,
            text: b.text.replace('\n', " ").trim().to_string(),
            kind: BlockKind::Text,
        })
        .collect()
}

/// Images large enough to carry content, placed at their first rectangle.
pub fn image_candidates(images: &[RawImage]) -> Vec<ImageCandidate> {
    images
        .iter()
        .filter(|img| img.bytes.len() >= MIN_IMAGE_BYTES)
        .filter_map(|img| {
            img.placements.first().map(|bbox| ImageCandidate {
                bbox: *bbox,
                bytes: img.bytes.clone(),
                mime_type: img.mime_type.clone(),
            })
        })
        .collect()
}

/// Diagram regions of a page: drawing primitives without specks and page
/// backgrounds, merged, then stripped of regions too small to be a figure.
pub fn diagram_regions(content: &PageContent) -> Vec<Region> {
    let page_area = content.width * content.height;
    let primitives: Vec<Region> = content
        .drawings
        .iter()
        .filter(|r| r.width() >= MIN_DRAWING_SIDE && r.height() >= MIN_DRAWING_SIDE)
        .filter(|r| r.area() <= page_area * MAX_DRAWING_PAGE_FRACTION)
        .copied()
        .collect();

    merge_regions(&primitives, DIAGRAM_MERGE_PADDING)
        .into_iter()
        .filter(|r| r.width() >= MIN_DIAGRAM_SIDE && r.height() >= MIN_DIAGRAM_SIDE)
        .collect()
}

/// Snapshot the page at 0-based `index`.
///
/// A region that fails to render is logged and skipped; the rest of the
/// page is kept.
pub fn snapshot_page(
    source: &dyn PageSource,
    index: usize,
    options: &SnapshotOptions,
) -> Result<PageSnapshot> {
    let page = index as u32 + 1;
    let content = source.page(index)?;
    let text_blocks = text_blocks(page, &content.text_blocks);

    let (images, diagrams) = if options.include_visuals {
        let images = image_candidates(&content.images);
        let mut diagrams = Vec::new();
        for bbox in diagram_regions(&content) {
            match source.render_region(index, &bbox, options.render_zoom) {
                Ok(png) => diagrams.push(DiagramCandidate { bbox, png }),
                Err(e) => warn!(page, error = %e, "Diagram render failed, skipping region"),
            }
        }
        (images, diagrams)
    } else {
        (Vec::new(), Vec::new())
    };

    debug!(
        page,
        text_blocks = text_blocks.len(),
        images = images.len(),
        diagrams = diagrams.len(),
        "Page snapshot taken"
    );

    Ok(PageSnapshot {
        page,
        text_blocks,
        images,
        diagrams,
    })
}

/// Snapshot every page in order.
pub fn snapshot_document(
    source: &dyn PageSource,
    options: &SnapshotOptions,
) -> Result<Vec<PageSnapshot>> {
    (0..source.page_count())
        .map(|index| snapshot_page(source, index, options))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory page source and loader used by the extractor and pipeline tests.

    use std::collections::HashSet;

    use paperscope_core::Error;

    use super::*;

    #[derive(Default, Clone)]
    pub struct FakePages {
        pub pages: Vec<PageContent>,
        /// (page index, region x0) pairs whose rendering fails.
        pub failing_renders: HashSet<(usize, i64)>,
    }

    impl PageSource for FakePages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page(&self, index: usize) -> Result<PageContent> {
            self.pages
                .get(index)
                .cloned()
                .ok_or_else(|| Error::Document(format!("no page {}", index)))
        }

        fn render_region(&self, index: usize, region: &Region, zoom: f32) -> Result<Vec<u8>> {
            if self.failing_renders.contains(&(index, region.x0 as i64)) {
                return Err(Error::Document("render failed".to_string()));
            }
            Ok(format!("png:{}:{}:{}", index, region.x0, zoom).into_bytes())
        }
    }

    pub struct FakeLoader(pub FakePages);

    impl DocumentLoader for FakeLoader {
        fn snapshot(&self, _path: &Path, options: &SnapshotOptions) -> Result<Vec<PageSnapshot>> {
            snapshot_document(&self.0, options)
        }
    }

    pub fn paragraph(text: &str, y: f32) -> RawTextBlock {
        RawTextBlock {
            bbox: Region::new(50.0, y, 550.0, y + 40.0),
            text: text.to_string(),
            is_text: true,
        }
    }

    pub fn image(size: usize, x: f32) -> RawImage {
        RawImage {
            bytes: vec![0u8; size],
            mime_type: "image/png".to_string(),
            placements: vec![Region::new(x, 400.0, x + 100.0, 500.0)],
        }
    }

    pub fn letter_page() -> PageContent {
        PageContent {
            width: 612.0,
            height: 792.0,
            ..Default::default()
        }
    }
}
