//! Opaque masks over replaced text, trimmed around protected zones.

use super::options::BuildOptions;
use crate::model::{ProtectedZone, Rect};

/// Mask for a block, or `None` when the block must be left alone.
///
/// The block box grows by the mask padding. A zone covering more than the
/// configured share of the mask vetoes it; otherwise a zone whose top edge
/// falls inside the mask cuts the mask's bottom off, and a zone whose bottom
/// edge falls inside cuts its top. Masks left too short are dropped.
pub fn plan_mask(bbox: &Rect, zones: &[ProtectedZone], options: &BuildOptions) -> Option<Rect> {
    let mut mask = bbox.expand(options.mask_padding);
    if mask.area() <= 0.0 {
        return None;
    }

    for zone in zones {
        let z = &zone.rect;
        if mask.intersection(z).is_none() {
            continue;
        }
        if mask.overlap_ratio(z) > options.mask_overlap {
            log::debug!(
                "Mask {:?} overlaps {} zone by more than {:.0}%",
                mask,
                zone.label(),
                options.mask_overlap * 100.0
            );
            return None;
        }
        if z.y0 > mask.y0 && z.y0 < mask.y1 {
            mask.y1 = z.y0;
        }
        if z.y1 < mask.y1 && z.y1 > mask.y0 {
            mask.y0 = z.y1;
        }
    }

    if mask.height() < options.min_mask_height {
        return None;
    }
    Some(mask)
}
