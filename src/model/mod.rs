//! Layout model shared by extraction and reconstruction.
//!
//! All coordinates are in PDF points with a top-left origin; the builder
//! flips them when writing PDF objects.

mod block;
mod document;
mod geometry;
mod page;
mod text;

pub use block::{BlockStyle, Rotation, TextBlock};
pub use document::DocumentLayout;
pub use geometry::Rect;
pub use page::{Link, LinkKind, PageBackground, PageLayout, ProtectedZone, ZoneSource};
pub use text::{Rewrites, Text};
