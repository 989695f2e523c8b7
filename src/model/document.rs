//! Document-level types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{PageLayout, Rewrites, TextBlock};
use crate::error::Result;

/// Layout of a whole document, one entry per source page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Pages in document order
    pub pages: Vec<PageLayout>,

    /// Parsed source document, needed to paint `Source` backgrounds
    #[serde(skip)]
    source: Option<Arc<lopdf::Document>>,
}

impl DocumentLayout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the parsed source document.
    pub fn with_source(mut self, source: Arc<lopdf::Document>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn set_source(&mut self, source: Arc<lopdf::Document>) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&lopdf::Document> {
        self.source.as_deref()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn add_page(&mut self, page: PageLayout) {
        self.pages.push(page);
    }

    /// All blocks in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    pub fn zone_count(&self) -> usize {
        self.pages.iter().map(|p| p.zones.len()).sum()
    }

    pub fn link_count(&self) -> usize {
        self.pages.iter().map(|p| p.links.len()).sum()
    }

    pub fn find_block(&self, id: &str) -> Option<&TextBlock> {
        self.blocks().find(|b| b.id == id)
    }

    /// Attach replacement text to the blocks named in `rewrites`.
    ///
    /// Returns how many blocks received text. Ids not present in the layout
    /// are ignored, as are empty replacements.
    pub fn apply_rewrites(&mut self, rewrites: &Rewrites) -> usize {
        let mut applied = 0;
        for block in self.pages.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
            if let Some(text) = rewrites.get(&block.id) {
                let preferred = text.preferred();
                if preferred.is_empty() {
                    continue;
                }
                block.rewritten_text = Some(preferred.to_string());
                applied += 1;
            }
        }
        if applied < rewrites.len() {
            log::debug!(
                "{} of {} rewrites matched no block",
                rewrites.len() - applied,
                rewrites.len()
            );
        }
        applied
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a layout previously written by [`DocumentLayout::to_json`].
    ///
    /// The result has no source attached.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, Text};

    fn sample() -> DocumentLayout {
        let mut page = PageLayout::new(0, 612.0, 792.0);
        page.blocks.push(TextBlock::new(
            "block_0",
            Rect::new(72.0, 100.0, 540.0, 130.0),
            "Abstract",
        ));
        page.blocks.push(TextBlock::new(
            "block_1",
            Rect::new(72.0, 140.0, 540.0, 300.0),
            "We propose",
        ));
        let mut layout = DocumentLayout::new();
        layout.add_page(page);
        layout
    }

    #[test]
    fn test_apply_rewrites() {
        let mut layout = sample();
        let rewrites = Rewrites::new()
            .with("block_1", "Nous proposons")
            .with("block_7", "orphan")
            .with(
                "block_0",
                Text::Bilingual {
                    en: None,
                    zh: None,
                },
            );

        assert_eq!(layout.apply_rewrites(&rewrites), 1);
        assert_eq!(
            layout.find_block("block_1").unwrap().rewritten_text.as_deref(),
            Some("Nous proposons")
        );
        assert!(layout.find_block("block_0").unwrap().rewritten_text.is_none());
    }

    #[test]
    fn test_json_round_trip_drops_source() {
        let layout = sample().with_source(Arc::new(lopdf::Document::with_version("1.5")));
        assert!(layout.source().is_some());

        let json = layout.to_json().unwrap();
        let back = DocumentLayout::from_json(&json).unwrap();
        assert!(back.source().is_none());
        assert_eq!(back.block_count(), 2);
        assert_eq!(back.pages[0].blocks[1].text, "We propose");
    }
}
