//! # repaper
//!
//! In-place PDF reconstruction.
//!
//! repaper extracts the geometric text blocks of a PDF, sets aside what must
//! not be touched (tables, figures, formulas, running headers), and rebuilds
//! the document with replacement text typeset into the original block boxes.
//! Backgrounds, page sizes and hyperlinks are kept.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repaper::{extract_layout, build_pdf, Rewrites};
//!
//! fn main() -> repaper::Result<()> {
//!     let pdf = std::fs::read("paper.pdf")?;
//!     let mut layout = extract_layout(&pdf)?;
//!
//!     let rewrites = Rewrites::new().with("block_0", "<h1>Ein Titel</h1>");
//!     layout.apply_rewrites(&rewrites);
//!
//!     std::fs::write("paper.de.pdf", build_pdf(&layout)?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Geometry extraction**: content stream interpretation with fonts,
//!   text matrices and form XObjects
//! - **Protected zones**: pluggable layout model plus a formula heuristic
//! - **Block merging**: configurable thresholds for paragraph reassembly
//! - **Font fitting**: replacement text shrinks to fit, clipped as a last resort
//! - **Parallel processing**: Uses Rayon for multi-page documents

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    BlockStyle, DocumentLayout, Link, LinkKind, PageBackground, PageLayout, ProtectedZone, Rect,
    Rewrites, Rotation, Text, TextBlock, ZoneSource,
};
pub use parser::{
    ErrorMode, ExtractOptions, LayoutBox, LayoutExtractor, LayoutModel, LopdfBackend,
    MathConfig, MergeConfig, PageImage, PageRasterizer, ZoneConfig,
};
pub use render::{BuildOptions, PagePlan, PdfBuilder, StyleTable};

use std::path::Path;
use std::sync::Arc;

/// Extract the layout of a PDF with default options.
///
/// # Example
///
/// ```no_run
/// let pdf = std::fs::read("paper.pdf").unwrap();
/// let layout = repaper::extract_layout(&pdf).unwrap();
/// println!("{} blocks", layout.block_count());
/// ```
pub fn extract_layout(pdf: &[u8]) -> Result<DocumentLayout> {
    LayoutExtractor::default().extract(pdf)
}

/// Extract the layout of a PDF file.
pub fn extract_layout_file<P: AsRef<Path>>(path: P) -> Result<DocumentLayout> {
    let data = std::fs::read(path)?;
    extract_layout(&data)
}

/// Build a PDF from a layout with default options.
///
/// Pages with a `Source` background need the layout's source document; a
/// layout from [`extract_layout`] carries it, one read from JSON does not
/// (see [`build_pdf_with_source`]).
pub fn build_pdf(layout: &DocumentLayout) -> Result<Vec<u8>> {
    PdfBuilder::default().build(layout)
}

/// Build a PDF from a deserialized layout, painting pages of `source_pdf`
/// as backgrounds.
pub fn build_pdf_with_source(layout: &mut DocumentLayout, source_pdf: &[u8]) -> Result<Vec<u8>> {
    let backend = LopdfBackend::load_bytes(source_pdf)?;
    layout.set_source(backend.shared_doc());
    PdfBuilder::default().build(layout)
}

/// Extract, apply `rewrites` and rebuild in one call.
pub fn reconstruct(pdf: &[u8], rewrites: &Rewrites) -> Result<Vec<u8>> {
    Repaper::new().reconstruct(pdf, rewrites)
}

/// [`reconstruct`] from file to file.
pub fn reconstruct_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    rewrites: &Rewrites,
    output: Q,
) -> Result<()> {
    let data = std::fs::read(input)?;
    let pdf = reconstruct(&data, rewrites)?;
    std::fs::write(output, pdf)?;
    Ok(())
}

/// [`reconstruct`] on a blocking thread of the tokio runtime.
#[cfg(feature = "async")]
pub async fn reconstruct_async(pdf: Vec<u8>, rewrites: Rewrites) -> Result<Vec<u8>> {
    Repaper::new().reconstruct_async(pdf, rewrites).await
}

/// Builder for configuring extraction and reconstruction.
///
/// # Example
///
/// ```no_run
/// use repaper::{Repaper, Rewrites};
///
/// let pdf = std::fs::read("paper.pdf")?;
/// let rewrites = Rewrites::from_json(&std::fs::read_to_string("rewrites.json")?)?;
/// let out = Repaper::new()
///     .sequential()
///     .redraw_original()
///     .reconstruct(&pdf, &rewrites)?;
/// # Ok::<(), repaper::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Repaper {
    extractor: LayoutExtractor,
    builder: PdfBuilder,
}

impl Repaper {
    /// Create a new Repaper builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extractor = self.extractor.with_options(options);
        self
    }

    /// Set build options.
    pub fn with_build_options(mut self, options: BuildOptions) -> Self {
        self.builder = PdfBuilder::new(options);
        self
    }

    /// Fail on the first page that cannot be extracted.
    pub fn strict(mut self) -> Self {
        let options = self.extractor.options().clone().strict();
        self.extractor = self.extractor.with_options(options);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        let options = self.extractor.options().clone().sequential();
        self.extractor = self.extractor.with_options(options);
        self
    }

    /// Redraw blocks that have no replacement text.
    pub fn redraw_original(mut self) -> Self {
        let options = self.builder.options().clone().redraw_original(true);
        self.builder = PdfBuilder::new(options);
        self
    }

    /// Use a visual layout model for protected zones.
    pub fn with_model(mut self, model: Arc<dyn LayoutModel>) -> Self {
        self.extractor = self.extractor.with_model(model);
        self
    }

    /// Use a rasterizer for page backgrounds and model input.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.extractor = self.extractor.with_rasterizer(rasterizer);
        self
    }

    pub fn extract(&self, pdf: &[u8]) -> Result<DocumentLayout> {
        self.extractor.extract(pdf)
    }

    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentLayout> {
        let data = std::fs::read(path)?;
        self.extract(&data)
    }

    pub fn build(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        self.builder.build(layout)
    }

    /// Extract, apply `rewrites` and rebuild.
    pub fn reconstruct(&self, pdf: &[u8], rewrites: &Rewrites) -> Result<Vec<u8>> {
        let mut layout = self.extract(pdf)?;
        let applied = layout.apply_rewrites(rewrites);
        log::info!(
            "Rewriting {} of {} blocks on {} pages",
            applied,
            layout.block_count(),
            layout.page_count()
        );
        self.build(&layout)
    }

    /// [`Repaper::reconstruct`] on a blocking thread of the tokio runtime.
    #[cfg(feature = "async")]
    pub async fn reconstruct_async(&self, pdf: Vec<u8>, rewrites: Rewrites) -> Result<Vec<u8>> {
        let repaper = self.clone();
        tokio::task::spawn_blocking(move || repaper.reconstruct(&pdf, &rewrites))
            .await
            .map_err(|e| Error::Other(format!("Reconstruction task failed: {}", e)))?
    }
}
