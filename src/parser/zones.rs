//! Protected zones from an external layout model.
//!
//! The visual layout model is a black box: it receives a PNG of the page
//! and returns labeled boxes in raster pixels. Boxes with a protected label
//! become [`ProtectedZone`]s in page points.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use super::options::ZoneConfig;
use crate::error::Result;
use crate::model::{ProtectedZone, Rect};

/// A page raster handed to the layout model.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// PNG-encoded RGB raster
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Pixels per point
    pub scale: f32,
    /// Zero-based page index
    pub page_index: usize,
}

impl PageImage {
    /// Encode a raster as PNG.
    pub fn from_rgb(image: &RgbImage, scale: f32, page_index: usize) -> Result<Self> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            png,
            width: image.width(),
            height: image.height(),
            scale,
            page_index,
        })
    }
}

/// A labeled detection from the layout model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// `[x0, y0, x1, y1]` in raster pixels, top-left origin
    pub bbox: [f32; 4],
    /// Class label (`Table`, `Figure`, `Text`, ...)
    pub label: String,
    /// Confidence score
    pub score: f32,
}

impl LayoutBox {
    pub fn new(bbox: [f32; 4], label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }
}

/// Visual layout classifier.
pub trait LayoutModel: Send + Sync {
    /// Detect labeled regions on a page raster.
    fn detect(&self, page: &PageImage) -> Result<Vec<LayoutBox>>;
}

impl<F> LayoutModel for F
where
    F: Fn(&PageImage) -> Result<Vec<LayoutBox>> + Send + Sync,
{
    fn detect(&self, page: &PageImage) -> Result<Vec<LayoutBox>> {
        self(page)
    }
}

/// Renders a page of a PDF to an RGB raster.
pub trait PageRasterizer: Send + Sync {
    /// Render page `page_index` (0-based) at `scale` pixels per point.
    fn rasterize(&self, pdf: &[u8], page_index: usize, scale: f32) -> Result<RgbImage>;
}

impl<F> PageRasterizer for F
where
    F: Fn(&[u8], usize, f32) -> Result<RgbImage> + Send + Sync,
{
    fn rasterize(&self, pdf: &[u8], page_index: usize, scale: f32) -> Result<RgbImage> {
        self(pdf, page_index, scale)
    }
}

/// Keep protected labels above the score threshold, converted to points.
pub fn zones_from_boxes(boxes: &[LayoutBox], scale: f32, config: &ZoneConfig) -> Vec<ProtectedZone> {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    boxes
        .iter()
        .filter(|b| b.score >= config.min_score && config.is_protected_label(&b.label))
        .filter_map(|b| {
            let rect = Rect::from(b.bbox).normalized().scale_down(scale);
            rect.is_valid()
                .then(|| ProtectedZone::from_label(rect, b.label.clone()))
        })
        .collect()
}

/// True when more than `threshold` of the block's area lies inside one zone.
pub fn is_zone_protected(bbox: &Rect, zones: &[ProtectedZone], threshold: f32) -> bool {
    zones
        .iter()
        .any(|zone| bbox.overlap_ratio(&zone.rect) > threshold)
}
