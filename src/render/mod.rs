//! Rebuilding a PDF from a document layout.
//!
//! Each page is planned first ([`plan::PagePlanner`]): background, masks
//! trimmed around protected zones, fitted replacement text, then restored
//! links. [`PdfBuilder`] serializes the plans with lopdf.

mod background;
mod builder;
mod links;
mod mask;
pub mod metrics;
mod options;
pub mod plan;
pub mod reflow;

pub use background::{raster_xobject, SourceImporter};
pub use builder::PdfBuilder;
pub use mask::plan_mask;
pub use metrics::StandardFont;
pub use options::{BuildOptions, StyleTable};
pub use plan::{DrawOp, LinkOp, LinkTarget, PagePlan, PagePlanner, PageState, TextOp};
pub use reflow::{fit_text, wrap_text, FittedText, Markup, MarkupParser};
