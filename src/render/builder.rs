//! Serializes page plans into a new PDF.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::background::{raster_xobject, SourceImporter};
use super::links::{link_annotation, page_destination};
use super::metrics::StandardFont;
use super::options::BuildOptions;
use super::plan::{plan_page, DrawOp, PagePlan, TextOp};
use super::reflow::MarkupParser;
use crate::error::Result;
use crate::model::{DocumentLayout, PageBackground, Rect};

/// Resource name of the page background XObject.
const BACKGROUND: &str = "RpBg";

fn real(v: f32) -> Object {
    Object::Real(v)
}

/// Rebuilds a PDF from a [`DocumentLayout`].
#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    options: BuildOptions,
}

impl PdfBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Draw plans for every page, without writing anything.
    pub fn plan(&self, layout: &DocumentLayout) -> Result<Vec<PagePlan>> {
        let markup = MarkupParser::new()?;
        let pages = page_indices(layout);
        layout
            .pages
            .iter()
            .map(|page| plan_page(page, &pages, &self.options, &markup))
            .collect()
    }

    /// Build the output document and serialize it.
    pub fn build(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        let mut doc = self.build_document(layout)?;
        let mut output = Vec::new();
        doc.save_to(&mut output)?;
        Ok(output)
    }

    /// Build the output as a lopdf document.
    pub fn build_document(&self, layout: &DocumentLayout) -> Result<Document> {
        let plans = self.plan(layout)?;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in StandardFont::ALL {
            let dict = if font.is_composite() {
                cid_font(&mut doc, font)
            } else {
                dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_name(),
                    "Encoding" => "WinAnsiEncoding",
                }
            };
            fonts.set(font.resource_name(), doc.add_object(dict));
        }

        let mut importer = layout.source().map(SourceImporter::new);
        let mut kids = Vec::with_capacity(plans.len());
        let mut dests = Dictionary::new();

        for plan in &plans {
            let page_id = self.write_page(&mut doc, pages_id, plan, &fonts, importer.as_mut())?;
            dests.set(plan.destination.as_str(), page_destination(page_id));
            kids.push(Object::Reference(page_id));
        }
        log::debug!("Wrote {} pages", kids.len());

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let dests_id = doc.add_object(dests);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Dests" => dests_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("repaper ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        if self.options.compress {
            doc.compress();
        }
        Ok(doc)
    }

    fn write_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        plan: &PagePlan,
        fonts: &Dictionary,
        mut importer: Option<&mut SourceImporter<'_>>,
    ) -> Result<ObjectId> {
        let mut ops = Vec::new();
        let mut xobjects = Dictionary::new();
        let mut annots = Vec::new();

        for op in &plan.ops {
            match op {
                DrawOp::Background(background) => {
                    if let Some(id) = self.background(doc, plan, background, importer.as_deref_mut())? {
                        xobjects.set(BACKGROUND, id);
                        paint_background(&mut ops, background, plan);
                    }
                }
                DrawOp::Mask(rect) => mask_ops(&mut ops, &rect.flip_y(plan.height)),
                DrawOp::Text(text) => text_ops(&mut ops, text, plan.height),
                DrawOp::Link(link) => {
                    annots.push(Object::Reference(doc.add_object(link_annotation(link))));
                }
            }
        }

        let content = Content { operations: ops }.encode()?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut resources = dictionary! { "Font" => fonts.clone() };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), real(plan.width), real(plan.height)],
            "Contents" => content_id,
            "Resources" => resources,
        };
        if let Some(crop) = plan.crop_box {
            let crop = crop.flip_y(plan.height);
            page.set(
                "CropBox",
                vec![real(crop.x0), real(crop.y0), real(crop.x1), real(crop.y1)],
            );
        }
        if !plan.rotation.is_upright() {
            page.set("Rotate", i64::from(plan.rotation.degrees()));
        }
        if !annots.is_empty() {
            page.set("Annots", annots);
        }
        Ok(doc.add_object(page))
    }

    /// Add the background XObject; `None` when there is nothing to paint.
    fn background(
        &self,
        doc: &mut Document,
        plan: &PagePlan,
        background: &PageBackground,
        importer: Option<&mut SourceImporter<'_>>,
    ) -> Result<Option<ObjectId>> {
        match background {
            PageBackground::Raster { image, .. } => Ok(Some(raster_xobject(doc, image)?)),
            PageBackground::Source => match importer {
                Some(importer) => match importer.import_page(doc, plan.page_index) {
                    Ok(id) => Ok(Some(id)),
                    Err(e) => {
                        log::warn!("Page {}: cannot import source page: {}", plan.page_index, e);
                        Ok(None)
                    }
                },
                None => {
                    log::debug!("Page {}: no source document, blank background", plan.page_index);
                    Ok(None)
                }
            },
            PageBackground::Blank => Ok(None),
        }
    }
}

/// Non-embedded Type0 font over an Adobe-GB1 CIDFont, addressed in UCS-2.
fn cid_font(doc: &mut Document, font: StandardFont) -> Dictionary {
    let descriptor = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.base_name(),
        "Flags" => 6,
        "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => font.base_name(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 4,
        },
        "FontDescriptor" => descriptor,
        "DW" => i64::from(super::metrics::CJK_ADVANCE),
    });
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => font.base_name(),
        "Encoding" => "UniGB-UCS2-H",
        "DescendantFonts" => vec![Object::Reference(descendant)],
    }
}

fn page_indices(layout: &DocumentLayout) -> BTreeSet<usize> {
    layout.pages.iter().map(|p| p.page_index).collect()
}

fn paint_background(ops: &mut Vec<Operation>, background: &PageBackground, plan: &PagePlan) {
    ops.push(Operation::new("q", vec![]));
    if let PageBackground::Raster { .. } = background {
        // Image space is the unit square
        ops.push(Operation::new(
            "cm",
            vec![real(plan.width), 0.into(), 0.into(), real(plan.height), 0.into(), 0.into()],
        ));
    }
    ops.push(Operation::new("Do", vec![Object::Name(BACKGROUND.as_bytes().to_vec())]));
    ops.push(Operation::new("Q", vec![]));
}

/// White filled rectangle, `rect` in PDF space.
fn mask_ops(ops: &mut Vec<Operation>, rect: &Rect) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("rg", vec![1.into(), 1.into(), 1.into()]));
    ops.push(Operation::new(
        "re",
        vec![real(rect.x0), real(rect.y0), real(rect.width()), real(rect.height())],
    ));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn select_font(ops: &mut Vec<Operation>, font: StandardFont, size: f32) {
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.resource_name().as_bytes().to_vec()), real(size)],
    ));
}

fn text_ops(ops: &mut Vec<Operation>, text: &TextOp, page_height: f32) {
    ops.push(Operation::new("q", vec![]));
    if let Some(clip) = &text.clip {
        let clip = clip.flip_y(page_height);
        ops.push(Operation::new(
            "re",
            vec![real(clip.x0), real(clip.y0), real(clip.width()), real(clip.height())],
        ));
        ops.push(Operation::new("W", vec![]));
        ops.push(Operation::new("n", vec![]));
    }
    ops.push(Operation::new("g", vec![0.into()]));
    ops.push(Operation::new("BT", vec![]));
    select_font(ops, text.font, text.size);
    let mut current = text.font;
    for line in &text.lines {
        if line.text.is_empty() {
            continue;
        }
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                real(line.x),
                real(page_height - line.baseline),
            ],
        ));
        for (font, run) in text.font.runs(&line.text) {
            if font != current {
                select_font(ops, font, text.size);
                current = font;
            }
            let format = if font.is_composite() {
                StringFormat::Hexadecimal
            } else {
                StringFormat::Literal
            };
            ops.push(Operation::new("Tj", vec![Object::String(font.encode(&run), format)]));
        }
    }
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, PageLayout, TextBlock};

    fn layout() -> DocumentLayout {
        let mut layout = DocumentLayout::new();
        for i in 0..2 {
            let mut page = PageLayout::new(i, 595.0, 842.0).with_background(PageBackground::Blank);
            page.blocks.push(
                TextBlock::new(format!("block_{}", i), Rect::new(72.0, 100.0, 400.0, 140.0), "Hello")
                    .with_rewrite("Bonjour tout le monde"),
            );
            page.links.push(Link::goto(Rect::new(72.0, 700.0, 120.0, 712.0), 1 - i));
            layout.add_page(page);
        }
        layout
    }

    #[test]
    fn test_empty_layout_is_valid_pdf() {
        let bytes = PdfBuilder::default().build(&DocumentLayout::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_page_count_and_size() {
        let bytes = PdfBuilder::default().build(&layout()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        for page_id in pages.values() {
            let page = doc.get_dictionary(*page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            assert_eq!(media_box[2].as_float().unwrap(), 595.0);
            assert_eq!(media_box[3].as_float().unwrap(), 842.0);
        }
    }

    #[test]
    fn test_crop_box_and_rotation_written() {
        let mut layout = DocumentLayout::new();
        layout.add_page(
            PageLayout::new(0, 612.0, 792.0)
                .with_background(PageBackground::Blank)
                .with_crop_box(Rect::new(50.0, 40.0, 562.0, 742.0))
                .with_rotation(crate::model::Rotation::Deg270),
        );
        layout.add_page(PageLayout::new(1, 612.0, 792.0).with_background(PageBackground::Blank));

        let doc = PdfBuilder::default().build_document(&layout).unwrap();
        let pages = doc.get_pages();
        let first = doc.get_dictionary(pages[&1]).unwrap();
        let crop: Vec<f32> = first
            .get(b"CropBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        // Bottom-left origin: y runs 792-742 .. 792-40
        assert_eq!(crop, [50.0, 50.0, 562.0, 752.0]);
        assert_eq!(first.get(b"Rotate").unwrap().as_i64().unwrap(), 270);

        let second = doc.get_dictionary(pages[&2]).unwrap();
        assert!(second.get(b"CropBox").is_err());
        assert!(second.get(b"Rotate").is_err());
    }

    #[test]
    fn test_text_and_mask_written() {
        let builder = PdfBuilder::new(BuildOptions::default().uncompressed());
        let doc = builder.build_document(&layout()).unwrap();
        let first = *doc.get_pages().get(&1).unwrap();
        let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).to_string();
        assert!(content.contains("Bonjour tout le monde"));
        assert!(content.contains("/RpF1"));
        assert!(content.contains(" re"));
        // Mask comes before the text
        assert!(content.find(" re").unwrap() < content.find("BT").unwrap());
    }

    #[test]
    fn test_named_destinations_and_links() {
        let doc = PdfBuilder::default().build_document(&layout()).unwrap();
        let catalog = doc.catalog().unwrap();
        let dests_id = catalog.get(b"Dests").unwrap().as_reference().unwrap();
        let dests = doc.get_dictionary(dests_id).unwrap();
        assert!(dests.get(b"page_0").is_ok());
        assert!(dests.get(b"page_1").is_ok());

        let first = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(first).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 1);
        let annot = doc
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        assert_eq!(annot.get(b"Dest").unwrap().as_name().unwrap(), b"page_1");
    }

    #[test]
    fn test_untouched_page_has_no_text() {
        let mut layout = DocumentLayout::new();
        let mut page = PageLayout::new(0, 612.0, 792.0).with_background(PageBackground::Blank);
        page.blocks
            .push(TextBlock::new("block_0", Rect::new(72.0, 100.0, 400.0, 140.0), "Hello"));
        layout.add_page(page);

        let builder = PdfBuilder::new(BuildOptions::default().uncompressed());
        let doc = builder.build_document(&layout).unwrap();
        let first = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(first).unwrap();
        assert!(!String::from_utf8_lossy(&content).contains("BT"));
    }

    /// Strings shown with `/RpF4`, decoded from UCS-2.
    fn cjk_strings(doc: &Document) -> Vec<String> {
        let first = *doc.get_pages().get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(first).unwrap()).unwrap();
        let mut font = Vec::new();
        let mut shown = Vec::new();
        for op in content.operations {
            match op.operator.as_str() {
                "Tf" => font = op.operands[0].as_name().unwrap().to_vec(),
                "Tj" if font == b"RpF4" => {
                    let units: Vec<u16> = op.operands[0]
                        .as_str()
                        .unwrap()
                        .chunks(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect();
                    shown.push(String::from_utf16(&units).unwrap());
                }
                _ => {}
            }
        }
        shown
    }

    #[test]
    fn test_cjk_rewrite_drawn_with_cid_font() {
        let mut layout = DocumentLayout::new();
        let mut page = PageLayout::new(0, 612.0, 792.0).with_background(PageBackground::Blank);
        page.blocks.push(
            TextBlock::new("block_0", Rect::new(72.0, 100.0, 400.0, 140.0), "Results")
                .with_rewrite("<h2>实验结果</h2>"),
        );
        layout.add_page(page);

        let builder = PdfBuilder::new(BuildOptions::default().uncompressed());
        let doc = builder.build_document(&layout).unwrap();
        assert_eq!(cjk_strings(&doc), ["实验结果"]);

        let first = *doc.get_pages().get(&1).unwrap();
        let fonts = doc.get_page_fonts(first).unwrap();
        let cjk = fonts.get(b"RpF4".as_slice()).unwrap();
        assert_eq!(cjk.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(cjk.get(b"Encoding").unwrap().as_name().unwrap(), b"UniGB-UCS2-H");
    }

    #[test]
    fn test_mixed_rewrite_switches_fonts_per_run() {
        let mut layout = DocumentLayout::new();
        let mut page = PageLayout::new(0, 612.0, 792.0).with_background(PageBackground::Blank);
        page.blocks.push(
            TextBlock::new("block_0", Rect::new(72.0, 100.0, 400.0, 140.0), "Table 2")
                .with_rewrite("表 2 结果"),
        );
        layout.add_page(page);

        let builder = PdfBuilder::new(BuildOptions::default().uncompressed());
        let doc = builder.build_document(&layout).unwrap();
        assert_eq!(cjk_strings(&doc), ["表", "结果"]);
        let first = *doc.get_pages().get(&1).unwrap();
        let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).to_string();
        assert!(content.contains("( 2 )"));
        assert!(!content.contains('?'));
    }

    #[test]
    fn test_raster_background_painted() {
        let mut layout = DocumentLayout::new();
        let image = image::RgbImage::from_pixel(20, 10, image::Rgb([200, 200, 200]));
        layout.add_page(
            PageLayout::new(0, 200.0, 100.0).with_background(PageBackground::raster(image, 0.1)),
        );
        let builder = PdfBuilder::new(BuildOptions::default().uncompressed());
        let doc = builder.build_document(&layout).unwrap();
        let first = *doc.get_pages().get(&1).unwrap();
        let content = String::from_utf8_lossy(&doc.get_page_content(first).unwrap()).to_string();
        assert!(content.contains("/RpBg Do"));
        assert!(content.contains(" cm"));
    }
}
