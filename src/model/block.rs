//! Text blocks and their style metadata.

use serde::{Deserialize, Serialize};

use super::Rect;

/// Typographic role of a block.
///
/// Inferred from font size relative to the document's body size, and
/// overridden by semantic tags in rewritten text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    #[default]
    Body,
    H1,
    H2,
    H3,
    Caption,
}

impl BlockStyle {
    /// Name of the semantic tag for this style (`"h1"`, `"caption"`, ...).
    pub fn tag(self) -> &'static str {
        match self {
            BlockStyle::Body => "body",
            BlockStyle::H1 => "h1",
            BlockStyle::H2 => "h2",
            BlockStyle::H3 => "h3",
            BlockStyle::Caption => "caption",
        }
    }

    /// Style for a semantic tag name. `body` is not a tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(BlockStyle::H1),
            "h2" => Some(BlockStyle::H2),
            "h3" => Some(BlockStyle::H3),
            "caption" => Some(BlockStyle::Caption),
            _ => None,
        }
    }

    /// Classify an average span size against the document body size.
    pub fn from_relative_size(avg_size: f32, body_size: f32) -> Self {
        if avg_size > body_size * 1.6 {
            BlockStyle::H1
        } else if avg_size > body_size * 1.3 {
            BlockStyle::H2
        } else if avg_size < body_size * 0.9 {
            BlockStyle::Caption
        } else {
            BlockStyle::Body
        }
    }

    pub fn is_heading(self) -> bool {
        matches!(self, BlockStyle::H1 | BlockStyle::H2 | BlockStyle::H3)
    }
}

/// Text direction of a block, snapped to quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Snap a writing-direction vector to a rotation.
    ///
    /// The vector is in top-left page space (y down): `(1, 0)` is ordinary
    /// left-to-right text and `(0, -1)` runs bottom-to-top on screen.
    pub fn from_direction(dx: f32, dy: f32) -> Self {
        if dx.abs() < 0.1 {
            if dy < 0.0 {
                Rotation::Deg90
            } else {
                Rotation::Deg270
            }
        } else if dx < 0.0 {
            Rotation::Deg180
        } else {
            Rotation::Deg0
        }
    }

    /// Snap a page `/Rotate` value to a quarter turn. Negative values
    /// count counter-clockwise.
    pub fn from_page_rotate(degrees: i64) -> Self {
        match (degrees.rem_euclid(360) + 45) / 90 % 4 {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn is_upright(self) -> bool {
        self == Rotation::Deg0
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {}", other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

/// A rewritable region of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Unique within the document (`block_{n}`)
    pub id: String,
    /// Bounding box, top-left origin
    pub bbox: Rect,
    /// Original text, lines joined with `\n`
    pub text: String,
    /// Replacement text supplied by the rewriting service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_text: Option<String>,
    /// Style inferred from relative font size
    pub style: BlockStyle,
    /// Character-weighted average font size in points
    pub font_size: f32,
    /// At least half of the spans are bold
    pub is_bold: bool,
    /// Writing direction
    pub rotation: Rotation,
}

impl TextBlock {
    /// Create an upright body block; mostly useful for tests and callers that
    /// assemble layouts by hand.
    pub fn new(id: impl Into<String>, bbox: Rect, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bbox,
            text: text.into(),
            rewritten_text: None,
            style: BlockStyle::Body,
            font_size: 10.0,
            is_bold: false,
            rotation: Rotation::Deg0,
        }
    }

    pub fn with_style(mut self, style: BlockStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_rewrite(mut self, text: impl Into<String>) -> Self {
        self.rewritten_text = Some(text.into());
        self
    }

    /// Number of characters in the original text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Absorb `next` into this block: bbox union and newline-joined text.
    /// Id, style, size, weight and rotation stay those of `self`.
    pub fn absorb(&mut self, next: TextBlock) {
        self.bbox = self.bbox.union(&next.bbox);
        self.text.push('\n');
        self.text.push_str(&next.text);
    }
}
