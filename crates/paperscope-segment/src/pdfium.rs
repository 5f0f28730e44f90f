//! pdfium-backed document loader.
//!
//! pdfium reports text as positioned segments (runs of identically styled
//! text). Segments are assembled into lines and lines into paragraphs with a
//! line-margin heuristic: a line joins the paragraph above it when the
//! vertical gap is under half a line height and the two overlap horizontally.
//!
//! Coordinates are converted from PDF space (origin bottom-left) to page
//! space with the origin at the top-left, matching what document viewers use.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use pdfium_render::prelude::*;
use tracing::debug;

use paperscope_core::{Error, Region, Result};

use crate::page::{
    collect_page_objects, flip_to_page_space, snapshot_document, DocumentLoader, PageContent,
    PageObject, PageObjectKind, PageSnapshot, PageSource, RawTextBlock, SnapshotOptions,
};

/// Fraction of the line height below which two lines belong to one paragraph.
const LINE_MARGIN: f32 = 0.5;

/// Loads PDFs through a runtime-bound pdfium library.
///
/// The library is looked up in `library_dir` (when set) and then on the
/// system library path. Binding happens per document, inside the blocking
/// task that owns it.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader {
    library_dir: Option<PathBuf>,
}

impl PdfiumLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for the pdfium shared library in `dir` before the system path.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    /// Loader configured from `PDFIUM_LIBRARY_DIR`.
    pub fn from_env() -> Self {
        match std::env::var("PDFIUM_LIBRARY_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::new().with_library_dir(dir),
            _ => Self::new(),
        }
    }

    fn bind(&self) -> Result<Pdfium> {
        let dir = self
            .library_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./"));
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Error::Config(format!("Failed to bind pdfium library: {}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl DocumentLoader for PdfiumLoader {
    fn snapshot(&self, path: &Path, options: &SnapshotOptions) -> Result<Vec<PageSnapshot>> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| Error::Document(format!("Failed to load PDF: {}", e)))?;
        let pages = PdfiumPages { document };
        debug!(page_count = pages.page_count(), "PDF opened");
        snapshot_document(&pages, options)
    }
}

struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumPages<'_> {
    fn load_page(&self, index: usize) -> Result<PdfPage<'_>> {
        let index = u16::try_from(index)
            .map_err(|_| Error::Document(format!("Page index {} out of range", index)))?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| Error::Document(format!("Failed to load page {}: {}", index + 1, e)))
    }
}

/// Converts a PDF-space rectangle (bottom-left origin) to page space.
fn to_region(left: f32, bottom: f32, right: f32, top: f32, page_height: f32) -> Region {
    flip_to_page_space(&Region::new(left, bottom, right, top), page_height)
}

/// Mirror a pdfium page object, descending into form XObjects. Bounds stay
/// in the parent's PDF space; objects without bounds are dropped.
fn page_object(object: &PdfPageObject<'_>) -> Option<PageObject> {
    let b = object.bounds().ok()?;
    let bounds = Region::new(
        b.left().value,
        b.bottom().value,
        b.right().value,
        b.top().value,
    );

    let kind = if let Some(image_object) = object.as_image_object() {
        match image_object.get_raw_image() {
            Ok(raw) => {
                let rgba = raw.to_rgba8();
                let (w, h) = (rgba.width(), rgba.height());
                match encode_png(rgba.into_raw(), w, h) {
                    Ok(bytes) => PageObjectKind::Image {
                        bytes,
                        mime_type: "image/png".to_string(),
                    },
                    Err(e) => {
                        debug!(error = %e, "Skipping undecodable image");
                        PageObjectKind::Other
                    }
                }
            }
            Err(_) => PageObjectKind::Other,
        }
    } else if object.as_path_object().is_some() {
        PageObjectKind::Path
    } else if let Some(form) = object.as_x_object_form_object() {
        PageObjectKind::Form(form.iter().filter_map(|child| page_object(&child)).collect())
    } else {
        PageObjectKind::Other
    };

    Some(PageObject { bounds, kind })
}

/// Encode pdfium's decoded image through this crate's `image` types.
fn encode_png(rgba: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let buffer = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| Error::Document("Image buffer size mismatch".to_string()))?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Document(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes)
}

impl PageSource for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<PageContent> {
        let page = self.load_page(index)?;
        let width = page.width().value;
        let height = page.height().value;

        let text = page
            .text()
            .map_err(|e| Error::Document(format!("Failed to get page text: {}", e)))?;
        let mut segments = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let b = segment.bounds();
            segments.push(TextSegment {
                bbox: to_region(
                    b.left().value,
                    b.bottom().value,
                    b.right().value,
                    b.top().value,
                    height,
                ),
                text: content,
            });
        }

        let objects: Vec<PageObject> = page
            .objects()
            .iter()
            .filter_map(|object| page_object(&object))
            .collect();
        let (images, drawings) = collect_page_objects(&objects, height);

        Ok(PageContent {
            width,
            height,
            text_blocks: group_paragraphs(segments),
            images,
            drawings,
        })
    }

    fn render_region(&self, index: usize, region: &Region, zoom: f32) -> Result<Vec<u8>> {
        let page = self.load_page(index)?;
        let target_width = (page.width().value * zoom) as i32;
        let target_height = (page.height().value * zoom) as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(target_width)
                    .set_target_height(target_height),
            )
            .map_err(|e| Error::Document(format!("Failed to render page: {}", e)))?;
        let rendered = bitmap.as_image().to_rgba8();
        let (w, h) = (rendered.width(), rendered.height());
        let full = RgbaImage::from_raw(w, h, rendered.into_raw())
            .ok_or_else(|| Error::Document("Rendered bitmap size mismatch".to_string()))?;

        let clamp = |v: f32, max: u32| ((v * zoom).max(0.0) as u32).min(max);
        let x0 = clamp(region.x0, w);
        let y0 = clamp(region.y0, h);
        let x1 = clamp(region.x1, w);
        let y1 = clamp(region.y1, h);
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::Document("Region lies outside the page".to_string()));
        }

        let crop = image::imageops::crop_imm(&full, x0, y0, x1 - x0, y1 - y0).to_image();
        encode_png(crop.into_raw(), x1 - x0, y1 - y0)
    }
}

#[derive(Debug, Clone)]
struct TextSegment {
    bbox: Region,
    text: String,
}

/// Group text segments into paragraph blocks in reading order.
fn group_paragraphs(mut segments: Vec<TextSegment>) -> Vec<RawTextBlock> {
    segments.sort_by(|a, b| {
        a.bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .x0
                    .partial_cmp(&b.bbox.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    // Lines: segments on a shared baseline band that sit close horizontally.
    // Columns at the same height stay separate lines.
    let mut lines: Vec<TextSegment> = Vec::new();
    for segment in segments {
        match lines
            .iter_mut()
            .rev()
            .find(|line| same_line(&line.bbox, &segment.bbox))
        {
            Some(line) => {
                line.bbox = line.bbox.union(&segment.bbox);
                if !line.text.ends_with(' ') && !segment.text.starts_with(' ') {
                    line.text.push(' ');
                }
                line.text.push_str(&segment.text);
            }
            None => lines.push(segment),
        }
    }

    let mut paragraphs: Vec<TextSegment> = Vec::new();
    for line in lines {
        match paragraphs
            .iter_mut()
            .rev()
            .find(|para| continues_paragraph(&para.bbox, &line.bbox))
        {
            Some(para) => {
                para.bbox = para.bbox.union(&line.bbox);
                para.text.push('\n');
                para.text.push_str(line.text.trim());
            }
            None => paragraphs.push(TextSegment {
                text: line.text.trim().to_string(),
                bbox: line.bbox,
            }),
        }
    }

    paragraphs
        .into_iter()
        .map(|p| RawTextBlock {
            bbox: p.bbox,
            text: p.text,
            is_text: true,
        })
        .collect()
}

/// Vertical spans overlap by more than half the smaller height and the
/// horizontal gap is under two line heights.
fn same_line(a: &Region, b: &Region) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let height = a.height().min(b.height());
    let gap = b.x0.max(a.x0) - b.x1.min(a.x1);
    overlap > 0.5 * height && gap < 2.0 * height
}

fn continues_paragraph(para: &Region, line: &Region) -> bool {
    let gap = line.y0 - para.y1;
    let horizontal_overlap = para.x0 < line.x1 && line.x0 < para.x1;
    gap >= -0.5 * line.height() && gap < LINE_MARGIN * line.height() && horizontal_overlap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, x0: f32, y0: f32, x1: f32) -> TextSegment {
        TextSegment {
            bbox: Region::new(x0, y0, x1, y0 + 10.0),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_to_region_flips_origin() {
        let r = to_region(10.0, 700.0, 100.0, 720.0, 792.0);
        assert_eq!(r, Region::new(10.0, 72.0, 100.0, 92.0));
    }

    #[test]
    fn test_group_paragraphs_joins_segments_and_lines() {
        let blocks = group_paragraphs(vec![
            seg("world", 60.0, 100.0, 100.0),
            seg("Hello", 10.0, 100.0, 50.0),
            seg("second line", 10.0, 112.0, 90.0),
            // 40 below: new paragraph.
            seg("Next paragraph", 10.0, 162.0, 120.0),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Hello world\nsecond line");
        assert_eq!(blocks[0].bbox, Region::new(10.0, 100.0, 100.0, 122.0));
        assert_eq!(blocks[1].text, "Next paragraph");
    }

    #[test]
    fn test_two_columns_form_separate_paragraphs() {
        let blocks = group_paragraphs(vec![
            seg("left one", 10.0, 100.0, 250.0),
            seg("right one", 320.0, 100.0, 560.0),
            seg("left two", 10.0, 112.0, 250.0),
            seg("right two", 320.0, 112.0, 560.0),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "left one\nleft two");
        assert_eq!(blocks[1].text, "right one\nright two");
    }
}
