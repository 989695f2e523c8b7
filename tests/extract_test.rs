//! Integration tests for layout extraction.

mod common;

use repaper::{
    extract_layout, BlockStyle, DocumentLayout, Error, ExtractOptions, LayoutExtractor, LinkKind,
    MathConfig, Rect, Rotation,
};

fn texts(layout: &DocumentLayout) -> Vec<String> {
    layout.blocks().map(|b| b.text.clone()).collect()
}

#[test]
fn test_page_geometry() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    assert_eq!(layout.page_count(), 2);
    for (i, page) in layout.pages.iter().enumerate() {
        assert_eq!(page.page_index, i);
        assert_eq!(page.width, common::PAGE_WIDTH);
        assert_eq!(page.height, common::PAGE_HEIGHT);
        assert_eq!(page.background.kind(), "source");
    }
    assert!(layout.source().is_some());
}

#[test]
fn test_blocks_and_styles() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    let page = &layout.pages[0];
    assert_eq!(page.blocks.len(), 3);

    let title = &page.blocks[0];
    assert_eq!(title.id, "block_0");
    assert_eq!(title.text, "A Study of Layout");
    assert_eq!(title.style, BlockStyle::H1);
    assert!(title.is_bold);
    assert_eq!(title.rotation, Rotation::Deg0);

    let paragraph = &page.blocks[1];
    assert_eq!(paragraph.id, "block_1");
    assert_eq!(paragraph.style, BlockStyle::Body);
    assert!(!paragraph.is_bold);
    assert_eq!(
        paragraph.text,
        "This paragraph is the body of the page and it\n\
         continues on a second line of ordinary text\n\
         which ends here."
    );
    assert!((paragraph.font_size - 10.0).abs() < 0.01);

    let caption = &page.blocks[2];
    assert_eq!(caption.id, "block_2");
    assert_eq!(caption.style, BlockStyle::Caption);

    let second = &layout.pages[1].blocks;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, "block_3");
}

#[test]
fn test_block_boxes_are_top_left() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    let paragraph = layout.find_block("block_1").unwrap();
    // Baselines at 132..156 from the top, 10pt glyphs
    assert!((paragraph.bbox.x0 - 72.0).abs() < 0.01);
    assert!((paragraph.bbox.y0 - 124.0).abs() < 0.01);
    assert!((paragraph.bbox.y1 - 158.0).abs() < 0.01);

    let title = layout.find_block("block_0").unwrap();
    assert!(title.bbox.y1 <= paragraph.bbox.y0);
}

#[test]
fn test_running_footer_dropped() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    assert!(texts(&layout).iter().all(|t| !t.contains("Page 1")));
}

#[test]
fn test_math_fragment_protected() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    assert!(texts(&layout).iter().all(|t| !t.contains("x-axis")));

    let options = ExtractOptions::new().with_math(MathConfig::disabled());
    let layout = LayoutExtractor::new(options)
        .extract(&common::sample_pdf())
        .unwrap();
    assert_eq!(layout.pages[0].blocks.len(), 4);
    assert!(texts(&layout).iter().any(|t| t == "x-axis"));
}

#[test]
fn test_links() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    assert!(layout.pages[0].links.is_empty());

    let links = &layout.pages[1].links;
    assert_eq!(links.len(), 2);

    let uri = links
        .iter()
        .find(|l| matches!(l.kind, LinkKind::Uri(_)))
        .unwrap();
    assert_eq!(uri.kind, LinkKind::Uri("https://example.com/paper".to_string()));
    assert_eq!(uri.from, Rect::new(72.0, 84.0, 200.0, 94.0));

    let goto = links
        .iter()
        .find(|l| matches!(l.kind, LinkKind::GoTo { .. }))
        .unwrap();
    assert_eq!(goto.kind, LinkKind::GoTo { page_index: 0 });
    assert_eq!(goto.from, Rect::new(72.0, 180.0, 150.0, 192.0));
}

#[test]
fn test_not_a_pdf() {
    let err = extract_layout(b"<html>not a pdf</html>").unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn test_lenient_skips_broken_page() {
    let layout = extract_layout(&common::pdf_with_broken_page()).unwrap();
    assert_eq!(layout.page_count(), 3);
    assert!(layout.pages[2].blocks.is_empty());
    assert_eq!(layout.block_count(), 4);
}

#[test]
fn test_strict_fails_on_broken_page() {
    let result = LayoutExtractor::new(ExtractOptions::new().strict())
        .extract(&common::pdf_with_broken_page());
    assert!(result.is_err());
}

#[test]
fn test_sequential_matches_parallel() {
    let pdf = common::sample_pdf();
    let parallel = extract_layout(&pdf).unwrap();
    let sequential = LayoutExtractor::new(ExtractOptions::new().sequential())
        .extract(&pdf)
        .unwrap();
    assert_eq!(parallel.to_json().unwrap(), sequential.to_json().unwrap());
}

#[test]
fn test_layout_json_round_trip() {
    let layout = extract_layout(&common::sample_pdf()).unwrap();
    let json = layout.to_json().unwrap();
    assert!(json.contains("\"block_0\""));
    assert!(json.contains("\"h1\""));

    let restored = DocumentLayout::from_json(&json).unwrap();
    assert_eq!(restored.page_count(), 2);
    assert_eq!(texts(&restored), texts(&layout));
    assert_eq!(restored.pages[1].links, layout.pages[1].links);
    assert!(restored.source().is_none());
}
