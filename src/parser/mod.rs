//! PDF layout extraction.
//!
//! [`LayoutExtractor`] runs three passes over a document:
//!
//! 1. per page (parallel): interpret content into spans, group blocks,
//!    read links, optionally rasterize and query the layout model;
//! 2. compute the document body size from all spans;
//! 3. per page: drop header/footer, zone-protected and math blocks, assign
//!    `block_{n}` ids in document order, then merge adjacent blocks.

pub mod backend;
pub mod extract;
pub mod math;
pub mod merge;
mod options;
pub mod zones;

use std::sync::Arc;

use rayon::prelude::*;

pub use backend::{LopdfBackend, PdfBackend};
pub use extract::{FontStatistics, RawBlock, TextLine, TextSpan};
pub use math::{MathInput, Verdict};
pub use options::{ErrorMode, ExtractOptions, MathConfig, MergeConfig, ZoneConfig};
pub use zones::{LayoutBox, LayoutModel, PageImage, PageRasterizer};

use crate::error::Result;
use crate::model::{DocumentLayout, Link, PageBackground, PageLayout, ProtectedZone, Rect};
use backend::PageId;
use extract::ContentInterpreter;

/// First-pass result for one page.
struct PagePass {
    layout: PageLayout,
    blocks: Vec<RawBlock>,
    stats: FontStatistics,
}

/// Extracts a [`DocumentLayout`] from PDF bytes.
#[derive(Clone, Default)]
pub struct LayoutExtractor {
    options: ExtractOptions,
    model: Option<Arc<dyn LayoutModel>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl std::fmt::Debug for LayoutExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutExtractor")
            .field("options", &self.options)
            .field("model", &self.model.is_some())
            .field("rasterizer", &self.rasterizer.is_some())
            .finish()
    }
}

impl LayoutExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            model: None,
            rasterizer: None,
        }
    }

    /// Use a visual layout model for table/figure zones.
    pub fn with_model(mut self, model: Arc<dyn LayoutModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Use a rasterizer for page backgrounds and layout-model input.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Replace the options, keeping the model and rasterizer.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Parse `pdf` and extract its layout. The parsed document is attached
    /// to the result for vector backgrounds.
    pub fn extract(&self, pdf: &[u8]) -> Result<DocumentLayout> {
        let backend = LopdfBackend::load_bytes(pdf)?;
        let layout = self.extract_with(&backend, pdf)?;
        Ok(layout.with_source(backend.shared_doc()))
    }

    /// Extract through any backend. `pdf` is only handed to the rasterizer.
    pub fn extract_with<B: PdfBackend>(&self, backend: &B, pdf: &[u8]) -> Result<DocumentLayout> {
        let pages: Vec<(usize, PageId)> = backend.pages().into_values().enumerate().collect();
        log::debug!("Extracting layout of {} pages", pages.len());
        if self.model_without_rasterizer() {
            log::warn!("Layout model configured without a rasterizer; it will not run, math heuristic only");
        }

        let passes: Vec<PagePass> = if self.options.parallel {
            pages
                .par_iter()
                .map(|&(index, id)| self.first_pass(backend, pdf, index, id))
                .collect::<Result<_>>()?
        } else {
            pages
                .iter()
                .map(|&(index, id)| self.first_pass(backend, pdf, index, id))
                .collect::<Result<_>>()?
        };

        let body_size = passes
            .iter()
            .fold(FontStatistics::default(), |acc, p| acc.merge(p.stats.clone()))
            .body_size();
        log::debug!("Body font size: {:.1}pt", body_size);

        let filtered: Vec<(PageLayout, Vec<RawBlock>)> = if self.options.parallel {
            passes.into_par_iter().map(|p| self.filter_page(p)).collect()
        } else {
            passes.into_iter().map(|p| self.filter_page(p)).collect()
        };

        let mut counter = 0usize;
        let mut layout = DocumentLayout::new();
        for (mut page, blocks) in filtered {
            let text_blocks = blocks
                .into_iter()
                .map(|raw| {
                    let block = raw.into_text_block(format!("block_{}", counter), body_size);
                    counter += 1;
                    block
                })
                .collect();
            page.blocks = merge::merge_blocks(text_blocks, &self.options.merge);
            layout.add_page(page);
        }
        Ok(layout)
    }

    fn first_pass<B: PdfBackend>(
        &self,
        backend: &B,
        pdf: &[u8],
        index: usize,
        id: PageId,
    ) -> Result<PagePass> {
        let page_box = backend.page_box(id);
        let mut layout = PageLayout::new(index, page_box.width(), page_box.height())
            .with_rotation(backend.rotation(id));
        layout.crop_box = backend.crop_box(id).map(|crop| to_top_left(&crop, &page_box));

        let spans = match ContentInterpreter::new(backend, page_box, self.options.max_form_depth)
            .run_page(id)
        {
            Ok(spans) => spans,
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to extract page {}: {}", index + 1, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut stats = FontStatistics::default();
        stats.add_spans(&spans);

        layout.links = backend
            .page_links(id)
            .into_iter()
            .map(|raw| Link {
                from: to_top_left(&raw.rect, &page_box),
                kind: raw.kind,
            })
            .collect();

        if let Some(rasterizer) = &self.rasterizer {
            let scale = self.options.raster_scale;
            match rasterizer.rasterize(pdf, index, scale) {
                Ok(image) => {
                    layout.zones = self.detect_zones(&image, scale, index);
                    layout.background = PageBackground::raster(image, scale);
                }
                Err(e) => {
                    log::warn!("Rasterizing page {} failed, using source background: {}", index + 1, e);
                }
            }
        }

        Ok(PagePass {
            layout,
            blocks: extract::group_spans(spans),
            stats,
        })
    }

    /// A model only sees rasterized pages.
    fn model_without_rasterizer(&self) -> bool {
        self.model.is_some() && self.rasterizer.is_none()
    }

    fn detect_zones(&self, image: &image::RgbImage, scale: f32, index: usize) -> Vec<ProtectedZone> {
        let Some(model) = &self.model else {
            return Vec::new();
        };
        let boxes = PageImage::from_rgb(image, scale, index).and_then(|page| model.detect(&page));
        match boxes {
            Ok(boxes) => zones::zones_from_boxes(&boxes, scale, &self.options.zones),
            Err(e) => {
                log::warn!("Layout model failed on page {}, heuristic only: {}", index + 1, e);
                Vec::new()
            }
        }
    }

    /// Drop header/footer, zone-protected and formula blocks.
    fn filter_page(&self, pass: PagePass) -> (PageLayout, Vec<RawBlock>) {
        let PagePass { layout, blocks, .. } = pass;
        let height = layout.height;
        let kept = blocks
            .into_iter()
            .filter(|block| {
                if merge::is_header_footer(&block.bbox, height, &self.options.merge) {
                    log::debug!("Dropping header/footer block at y={:.1}", block.bbox.y0);
                    return false;
                }
                if zones::is_zone_protected(&block.bbox, &layout.zones, self.options.zones.block_overlap) {
                    return false;
                }
                let text = block.flat_text();
                let fonts = block.font_names();
                !math::is_math_block(&MathInput::new(&text, &fonts), &self.options.math)
            })
            .collect();
        (layout, kept)
    }
}

/// Map a PDF user-space rectangle into top-left page coordinates.
fn to_top_left(rect: &Rect, page_box: &Rect) -> Rect {
    Rect::new(
        rect.x0 - page_box.x0,
        page_box.y1 - rect.y1,
        rect.x1 - page_box.x0,
        page_box.y1 - rect.y0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_top_left() {
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        let link = Rect::new(72.0, 700.0, 144.0, 712.0);
        assert_eq!(to_top_left(&link, &page), Rect::new(72.0, 80.0, 144.0, 92.0));

        // Cropped origin
        let shifted = Rect::new(10.0, 20.0, 622.0, 812.0);
        assert_eq!(
            to_top_left(&Rect::new(82.0, 720.0, 154.0, 732.0), &shifted),
            Rect::new(72.0, 80.0, 144.0, 92.0)
        );
    }

    #[test]
    fn test_model_without_rasterizer_detected() {
        let model = |_: &PageImage| -> Result<Vec<zones::LayoutBox>> { Ok(Vec::new()) };
        let rasterizer = |_: &[u8], _: usize, _: f32| -> Result<image::RgbImage> {
            Ok(image::RgbImage::new(1, 1))
        };

        assert!(!LayoutExtractor::default().model_without_rasterizer());
        let idle = LayoutExtractor::default().with_model(Arc::new(model));
        assert!(idle.model_without_rasterizer());
        let wired = idle.with_rasterizer(Arc::new(rasterizer));
        assert!(!wired.model_without_rasterizer());
    }

    #[test]
    fn test_extractor_debug_hides_models() {
        let extractor = LayoutExtractor::default();
        let debug = format!("{:?}", extractor);
        assert!(debug.contains("model: false"));
    }
}
