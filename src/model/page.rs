//! Page-level layout types.

use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::{Rect, Rotation, TextBlock};

/// What gets painted underneath masks and text.
#[derive(Debug, Clone, Default)]
pub enum PageBackground {
    /// A rendered raster of the page, stretched to the full page box.
    Raster {
        image: Arc<RgbImage>,
        /// Pixels per point the raster was rendered at
        scale: f32,
    },
    /// The original page content, embedded as a form XObject.
    #[default]
    Source,
    /// Nothing; masks and text are drawn on white.
    Blank,
}

impl PageBackground {
    pub fn raster(image: RgbImage, scale: f32) -> Self {
        PageBackground::Raster {
            image: Arc::new(image),
            scale,
        }
    }

    /// Short name used in logs and the CLI summary.
    pub fn kind(&self) -> &'static str {
        match self {
            PageBackground::Raster { .. } => "raster",
            PageBackground::Source => "source",
            PageBackground::Blank => "blank",
        }
    }
}

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// External URI, kept verbatim.
    Uri(String),
    /// Internal jump to a page of the same document.
    GoTo { page_index: usize },
}

/// A clickable area on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Active area, top-left origin
    pub from: Rect,
    pub kind: LinkKind,
}

impl Link {
    pub fn uri(from: Rect, uri: impl Into<String>) -> Self {
        Self {
            from,
            kind: LinkKind::Uri(uri.into()),
        }
    }

    pub fn goto(from: Rect, page_index: usize) -> Self {
        Self {
            from,
            kind: LinkKind::GoTo { page_index },
        }
    }
}

/// Origin of a protected zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneSource {
    /// Labeled box from the visual layout model (`Table`, `Figure`, ...).
    LayoutModel { label: String },
}

/// A region of the page that must never be masked or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedZone {
    pub rect: Rect,
    pub source: ZoneSource,
}

impl ProtectedZone {
    pub fn from_label(rect: Rect, label: impl Into<String>) -> Self {
        Self {
            rect,
            source: ZoneSource::LayoutModel {
                label: label.into(),
            },
        }
    }

    pub fn label(&self) -> &str {
        match &self.source {
            ZoneSource::LayoutModel { label } => label,
        }
    }
}

fn is_upright(rotation: &Rotation) -> bool {
    rotation.is_upright()
}

/// Layout of a single page, top-left origin throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    /// Zero-based position in the source document
    pub page_index: usize,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Visible area when it is smaller than the page box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_box: Option<Rect>,
    /// Clockwise display rotation (`/Rotate`)
    #[serde(default, skip_serializing_if = "is_upright")]
    pub rotation: Rotation,
    /// Not serialized; a deserialized layout paints the source page.
    #[serde(skip)]
    pub background: PageBackground,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub zones: Vec<ProtectedZone>,
}

impl PageLayout {
    /// Create an empty page.
    pub fn new(page_index: usize, width: f32, height: f32) -> Self {
        Self {
            page_index,
            width,
            height,
            crop_box: None,
            rotation: Rotation::Deg0,
            background: PageBackground::Source,
            blocks: Vec::new(),
            links: Vec::new(),
            zones: Vec::new(),
        }
    }

    pub fn with_background(mut self, background: PageBackground) -> Self {
        self.background = background;
        self
    }

    pub fn with_crop_box(mut self, crop_box: Rect) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Full page box.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Blocks that carry replacement text.
    pub fn rewritten_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter(|b| b.rewritten_text.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
