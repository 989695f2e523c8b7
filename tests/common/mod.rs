//! Synthetic PDFs shared by the integration tests.
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// One line of text. `x`/`y` is the baseline start in PDF user space.
pub struct Line {
    pub font: &'static str,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

pub fn line(font: &'static str, size: f32, x: f32, y: f32, text: &str) -> Line {
    Line {
        font,
        size,
        x,
        y,
        text: text.to_string(),
    }
}

/// A link annotation, `rect` in PDF user space.
pub enum Annot {
    Uri { rect: [f32; 4], uri: String },
    GoTo { rect: [f32; 4], page: usize },
}

#[derive(Default)]
pub struct PageSpec {
    pub lines: Vec<Line>,
    pub annots: Vec<Annot>,
    /// Write an invalid /Contents entry
    pub broken: bool,
    pub crop_box: Option<[f32; 4]>,
    pub rotate: Option<i64>,
}

/// Fonts: F1 Helvetica, F2 Helvetica-Bold, F3 a TeX math italic.
fn font_resources(doc: &mut Document) -> Dictionary {
    let f1 = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let f2 = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let f3 = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "CMMI10",
    });
    dictionary! {
        "Font" => dictionary! {
            "F1" => f1,
            "F2" => f2,
            "F3" => f3,
        },
    }
}

fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v)).collect())
}

/// Write a letter-sized PDF with one page per `PageSpec`.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources = font_resources(&mut doc);
    let page_ids: Vec<ObjectId> = pages.iter().map(|_| doc.new_object_id()).collect();

    for (spec, &page_id) in pages.iter().zip(&page_ids) {
        let mut ops = Vec::new();
        for l in &spec.lines {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(l.font.as_bytes().to_vec()), Object::Real(l.size)],
            ));
            ops.push(Operation::new("Td", vec![Object::Real(l.x), Object::Real(l.y)]));
            ops.push(Operation::new("Tj", vec![Object::string_literal(l.text.as_str())]));
            ops.push(Operation::new("ET", vec![]));
        }
        let contents = if spec.broken {
            Object::Integer(42)
        } else {
            let content = Content { operations: ops }.encode().unwrap();
            Object::Reference(doc.add_object(lopdf::Stream::new(dictionary! {}, content)))
        };

        let annots: Vec<Object> = spec
            .annots
            .iter()
            .map(|annot| {
                let dict = match annot {
                    Annot::Uri { rect, uri } => dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Link",
                        "Rect" => rect_object(*rect),
                        "A" => dictionary! {
                            "S" => "URI",
                            "URI" => Object::string_literal(uri.as_str()),
                        },
                    },
                    Annot::GoTo { rect, page } => dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Link",
                        "Rect" => rect_object(*rect),
                        "Dest" => vec![Object::Reference(page_ids[*page]), "Fit".into()],
                    },
                };
                Object::Reference(doc.add_object(dict))
            })
            .collect();

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents,
            "Resources" => resources.clone(),
        };
        if !annots.is_empty() {
            page.set("Annots", annots);
        }
        if let Some(crop_box) = spec.crop_box {
            page.set("CropBox", rect_object(crop_box));
        }
        if let Some(rotate) = spec.rotate {
            page.set("Rotate", rotate);
        }
        doc.objects.insert(page_id, Object::Dictionary(page));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH), Object::Real(PAGE_HEIGHT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// URI link rect on the second page, directly over its paragraph.
pub const URI_LINK: [f32; 4] = [72.0, 698.0, 200.0, 708.0];
/// Internal link rect on the second page, pointing at the first.
pub const GOTO_LINK: [f32; 4] = [72.0, 600.0, 150.0, 612.0];

/// Two pages.
///
/// Page 1: a bold 20pt title, a three-line 10pt paragraph, a math-font
/// fragment, an 8pt caption and a page-number footer.
/// Page 2: one paragraph with a URI link over it and a link back to page 1.
///
/// Extracted blocks: `block_0` title, `block_1` paragraph, `block_2`
/// caption, `block_3` second-page paragraph.
pub fn sample_pages() -> Vec<PageSpec> {
    vec![
        PageSpec {
            lines: vec![
                line("F2", 20.0, 72.0, 700.0, "A Study of Layout"),
                line("F1", 10.0, 72.0, 660.0, "This paragraph is the body of the page and it"),
                line("F1", 10.0, 72.0, 648.0, "continues on a second line of ordinary text"),
                line("F1", 10.0, 72.0, 636.0, "which ends here."),
                line("F3", 10.0, 200.0, 560.0, "x-axis"),
                line("F1", 8.0, 72.0, 500.0, "Figure 1: a small caption under the figure"),
                line("F1", 9.0, 72.0, 30.0, "Page 1"),
            ],
            ..Default::default()
        },
        PageSpec {
            lines: vec![line(
                "F1",
                10.0,
                72.0,
                700.0,
                "Second page text that links back to the start.",
            )],
            annots: vec![
                Annot::Uri {
                    rect: URI_LINK,
                    uri: "https://example.com/paper".to_string(),
                },
                Annot::GoTo {
                    rect: GOTO_LINK,
                    page: 0,
                },
            ],
            ..Default::default()
        },
    ]
}

pub fn sample_pdf() -> Vec<u8> {
    build_pdf(&sample_pages())
}

/// The sample with a third page whose content cannot be read.
pub fn pdf_with_broken_page() -> Vec<u8> {
    let mut pages = sample_pages();
    pages.push(PageSpec {
        broken: true,
        ..Default::default()
    });
    build_pdf(&pages)
}

/// Content of every page of `pdf`, decompressed, in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).to_string())
        .collect()
}

/// Annotation dictionaries of page `index` of `pdf`.
pub fn page_annots(pdf: &[u8], index: usize) -> Vec<Dictionary> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().nth(index).unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    match page.get(b"Annots") {
        Ok(annots) => annots
            .as_array()
            .unwrap()
            .iter()
            .map(|a| doc.get_dictionary(a.as_reference().unwrap()).unwrap().clone())
            .collect(),
        Err(_) => Vec::new(),
    }
}
