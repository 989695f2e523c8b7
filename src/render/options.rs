//! Build options and the style table.

use super::metrics::StandardFont;
use crate::model::BlockStyle;

/// Options for rebuilding a document from its layout.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Nominal sizes and leading per style
    pub styles: StyleTable,

    /// Points added on every side of a block before masking
    pub mask_padding: f32,

    /// Skip the block when more than this share of its mask lies in a zone
    pub mask_overlap: f32,

    /// Skip the block when its trimmed mask is shorter than this
    pub min_mask_height: f32,

    /// Font size floor for the fitting search
    pub min_font_size: f32,

    /// Font size decrement per fitting step
    pub font_step: f32,

    /// Drop a link when a redrawn block covers more than this share of it
    pub link_cover: f32,

    /// Redraw blocks that carry no replacement text
    pub redraw_original: bool,

    /// Flate-compress content streams
    pub compress: bool,
}

impl BuildOptions {
    /// Create build options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(mut self, styles: StyleTable) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_mask_padding(mut self, padding: f32) -> Self {
        self.mask_padding = padding.max(0.0);
        self
    }

    pub fn with_mask_overlap(mut self, ratio: f32) -> Self {
        self.mask_overlap = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_min_mask_height(mut self, height: f32) -> Self {
        self.min_mask_height = height.max(0.0);
        self
    }

    /// Set the fitting floor and step.
    pub fn with_font_fitting(mut self, min_size: f32, step: f32) -> Self {
        self.min_font_size = min_size.max(0.5);
        self.font_step = step.max(0.1);
        self
    }

    pub fn with_link_cover(mut self, ratio: f32) -> Self {
        self.link_cover = ratio.clamp(0.0, 1.0);
        self
    }

    /// Redraw untouched blocks with their original text.
    pub fn redraw_original(mut self, redraw: bool) -> Self {
        self.redraw_original = redraw;
        self
    }

    /// Write uncompressed streams (handy when inspecting output).
    pub fn uncompressed(mut self) -> Self {
        self.compress = false;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            styles: StyleTable::default(),
            mask_padding: 1.0,
            mask_overlap: 0.3,
            min_mask_height: 5.0,
            min_font_size: 4.0,
            font_step: 0.5,
            link_cover: 0.5,
            redraw_original: false,
            compress: true,
        }
    }
}

/// Nominal font size per block style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTable {
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
    pub caption: f32,
    pub body: f32,
    /// Line height as a multiple of the font size
    pub leading: f32,
}

impl StyleTable {
    pub fn nominal_size(&self, style: BlockStyle) -> f32 {
        match style {
            BlockStyle::H1 => self.h1,
            BlockStyle::H2 => self.h2,
            BlockStyle::H3 => self.h3,
            BlockStyle::Caption => self.caption,
            BlockStyle::Body => self.body,
        }
    }

    /// Headings are bold, captions oblique. Characters this font cannot
    /// encode are drawn per run in [`StandardFont::SongLight`], see
    /// [`StandardFont::runs`].
    pub fn font(&self, style: BlockStyle) -> StandardFont {
        match style {
            BlockStyle::H1 | BlockStyle::H2 | BlockStyle::H3 => StandardFont::HelveticaBold,
            BlockStyle::Caption => StandardFont::HelveticaOblique,
            BlockStyle::Body => StandardFont::Helvetica,
        }
    }

    pub fn with_body(mut self, size: f32) -> Self {
        self.body = size;
        self
    }

    pub fn with_leading(mut self, leading: f32) -> Self {
        self.leading = leading.max(1.0);
        self
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            h1: 14.0,
            h2: 12.0,
            h3: 10.0,
            caption: 8.0,
            body: 9.0,
            leading: 1.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BuildOptions::default();
        assert_eq!(options.mask_overlap, 0.3);
        assert_eq!(options.min_font_size, 4.0);
        assert_eq!(options.font_step, 0.5);
        assert!(!options.redraw_original);
        assert!(options.compress);
    }

    #[test]
    fn test_style_table() {
        let styles = StyleTable::default();
        assert_eq!(styles.nominal_size(BlockStyle::H1), 14.0);
        assert_eq!(styles.nominal_size(BlockStyle::Body), 9.0);
        assert_eq!(styles.font(BlockStyle::H2), StandardFont::HelveticaBold);
        assert_eq!(styles.font(BlockStyle::Caption), StandardFont::HelveticaOblique);
        assert_eq!(styles.font(BlockStyle::Body), StandardFont::Helvetica);
    }

    #[test]
    fn test_builder_clamps() {
        let options = BuildOptions::new()
            .with_mask_overlap(1.5)
            .with_font_fitting(0.0, 0.0)
            .uncompressed();
        assert_eq!(options.mask_overlap, 1.0);
        assert_eq!(options.min_font_size, 0.5);
        assert_eq!(options.font_step, 0.1);
        assert!(!options.compress);
    }
}
