//! Header/footer filtering and vertical block merging.

use super::options::MergeConfig;
use crate::model::{Rect, TextBlock};

/// True when the box starts in the header band or ends in the footer band.
pub fn is_header_footer(bbox: &Rect, page_height: f32, config: &MergeConfig) -> bool {
    bbox.y0 < page_height * config.header_band || bbox.y1 > page_height * (1.0 - config.footer_band)
}

/// Whether `next` continues `current`.
///
/// `next` must start at most `max_vertical_gap` below `current` (a small
/// overlap is tolerated), share its left edge and rotation, and the combined
/// text must stay under the character cap.
pub fn can_merge(current: &TextBlock, next: &TextBlock, config: &MergeConfig) -> bool {
    let v_gap = next.bbox.y0 - current.bbox.y1;
    let x_offset = (next.bbox.x0 - current.bbox.x0).abs();
    v_gap >= config.min_vertical_gap
        && v_gap < config.max_vertical_gap
        && x_offset < config.max_x_offset
        && current.rotation == next.rotation
        && current.char_len() + next.char_len() < config.max_chars
}

/// Sort blocks top to bottom (stable) and merge runs of compatible blocks.
///
/// A merged block keeps the first block's id, style, size, weight and
/// rotation; its box is the union and its text the newline-joined texts.
pub fn merge_blocks(mut blocks: Vec<TextBlock>, config: &MergeConfig) -> Vec<TextBlock> {
    blocks.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));

    let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
    let mut iter = blocks.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        if can_merge(&current, &next, config) {
            log::debug!("Merging {} into {}", next.id, current.id);
            current.absorb(next);
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rotation;

    fn block(id: &str, x0: f32, y0: f32, x1: f32, y1: f32, chars: usize) -> TextBlock {
        TextBlock::new(id, Rect::new(x0, y0, x1, y1), "a".repeat(chars))
    }

    #[test]
    fn test_header_footer_band() {
        let config = MergeConfig::default();
        let h = 800.0;
        assert!(is_header_footer(&Rect::new(0.0, 30.0, 100.0, 50.0), h, &config));
        assert!(is_header_footer(&Rect::new(0.0, 740.0, 100.0, 770.0), h, &config));
        assert!(!is_header_footer(&Rect::new(0.0, 41.0, 100.0, 759.0), h, &config));
    }

    #[test]
    fn test_merge_adjacent_paragraph_pieces() {
        let blocks = vec![
            block("block_0", 72.0, 100.0, 300.0, 120.0, 80),
            block("block_1", 72.0, 128.0, 310.0, 150.0, 80),
        ];
        let merged = merge_blocks(blocks, &MergeConfig::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "block_0");
        assert_eq!(merged[0].bbox, Rect::new(72.0, 100.0, 310.0, 150.0));
        assert_eq!(merged[0].text.lines().count(), 2);
    }

    #[test]
    fn test_merge_boundaries() {
        let config = MergeConfig::default();
        let base = block("a", 72.0, 100.0, 300.0, 120.0, 10);

        // Gap of exactly 15 is excluded, -5 is included
        assert!(!can_merge(&base, &block("b", 72.0, 135.0, 300.0, 150.0, 10), &config));
        assert!(can_merge(&base, &block("b", 72.0, 115.0, 300.0, 150.0, 10), &config));
        assert!(!can_merge(&base, &block("b", 72.0, 114.0, 300.0, 150.0, 10), &config));

        // Left edges 15pt apart are not aligned
        assert!(!can_merge(&base, &block("b", 87.0, 125.0, 300.0, 150.0, 10), &config));
        assert!(can_merge(&base, &block("b", 86.0, 125.0, 300.0, 150.0, 10), &config));

        // Character cap
        assert!(!can_merge(&base, &block("b", 72.0, 125.0, 300.0, 150.0, 490), &config));
        assert!(can_merge(&base, &block("b", 72.0, 125.0, 300.0, 150.0, 489), &config));

        let rotated = block("b", 72.0, 125.0, 300.0, 150.0, 10).with_rotation(Rotation::Deg90);
        assert!(!can_merge(&base, &rotated, &config));
    }

    #[test]
    fn test_unmergeable_blocks_keep_order() {
        let blocks = vec![
            block("block_2", 72.0, 400.0, 300.0, 420.0, 10),
            block("block_0", 72.0, 100.0, 300.0, 120.0, 10),
            block("block_1", 320.0, 100.0, 540.0, 120.0, 10),
        ];
        let merged = merge_blocks(blocks, &MergeConfig::default());
        let ids: Vec<_> = merged.iter().map(|b| b.id.as_str()).collect();
        // Stable: equal y0 keeps input order
        assert_eq!(ids, ["block_0", "block_1", "block_2"]);
    }

    #[test]
    fn test_merge_chain_uses_growing_box() {
        let blocks = vec![
            block("block_0", 72.0, 100.0, 300.0, 120.0, 10),
            block("block_1", 72.0, 125.0, 300.0, 145.0, 10),
            block("block_2", 72.0, 150.0, 300.0, 170.0, 10),
        ];
        let merged = merge_blocks(blocks, &MergeConfig::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox.y1, 170.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_blocks(Vec::new(), &MergeConfig::default()).is_empty());
    }
}
