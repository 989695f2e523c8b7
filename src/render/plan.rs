//! Per-page draw plans.
//!
//! A [`PagePlanner`] walks a page through its build states in order:
//!
//! ```text
//! Started -> BackgroundPainted -> MasksPlanned -> TextRendered -> LinksRestored -> PageClosed
//! ```
//!
//! and records [`DrawOp`]s instead of writing PDF objects, so plans can be
//! inspected before serialization. Masks and text are in top-left page
//! coordinates; link rectangles are already in PDF space.

use std::collections::BTreeSet;

use super::mask::plan_mask;
use super::metrics::StandardFont;
use super::options::BuildOptions;
use super::reflow::{fit_text, MarkupParser};
use crate::error::{Error, Result};
use crate::model::{LinkKind, PageBackground, PageLayout, Rect, Rotation, TextBlock};

/// Build state of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PageState {
    Started,
    BackgroundPainted,
    MasksPlanned,
    TextRendered,
    LinksRestored,
    PageClosed,
}

/// One line of text at its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

/// Replacement text for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOp {
    pub block_id: String,
    pub font: StandardFont,
    pub size: f32,
    pub lines: Vec<PlacedLine>,
    /// Clip rectangle when the text overflows its box at the size floor
    pub clip: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Uri(String),
    /// Named destination registered in the catalog
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkOp {
    /// Annotation rectangle, bottom-left origin
    pub rect: Rect,
    pub target: LinkTarget,
}

#[derive(Debug, Clone)]
pub enum DrawOp {
    Background(PageBackground),
    Mask(Rect),
    Text(TextOp),
    Link(LinkOp),
}

/// Ordered draw operations for one output page.
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    /// Visible area, top-left origin
    pub crop_box: Option<Rect>,
    pub rotation: Rotation,
    /// Named destination pointing at this page
    pub destination: String,
    pub ops: Vec<DrawOp>,
}

impl PagePlan {
    pub fn masks(&self) -> impl Iterator<Item = &Rect> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Mask(rect) => Some(rect),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextOp> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkOp> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Link(link) => Some(link),
            _ => None,
        })
    }
}

/// Named destination of an output page.
pub fn destination_name(page_index: usize) -> String {
    format!("page_{}", page_index)
}

/// A block chosen for redrawing, with its mask.
struct Candidate<'a> {
    block: &'a TextBlock,
    text: &'a str,
    mask: Rect,
}

/// Plans one page, one state at a time.
pub struct PagePlanner<'a> {
    page: &'a PageLayout,
    options: &'a BuildOptions,
    markup: &'a MarkupParser,
    state: PageState,
    plan: PagePlan,
    candidates: Vec<Candidate<'a>>,
    drawn: Vec<Rect>,
}

impl<'a> PagePlanner<'a> {
    pub fn new(page: &'a PageLayout, options: &'a BuildOptions, markup: &'a MarkupParser) -> Self {
        Self {
            page,
            options,
            markup,
            state: PageState::Started,
            plan: PagePlan {
                page_index: page.page_index,
                width: page.width,
                height: page.height,
                crop_box: page.crop_box,
                rotation: page.rotation,
                destination: destination_name(page.page_index),
                ops: Vec::new(),
            },
            candidates: Vec::new(),
            drawn: Vec::new(),
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    fn advance(&mut self, from: PageState, to: PageState) -> Result<()> {
        if self.state != from {
            return Err(Error::Render(format!(
                "page {}: cannot move to {:?} from {:?}",
                self.page.page_index, to, self.state
            )));
        }
        log::trace!("page {}: {:?} -> {:?}", self.page.page_index, from, to);
        self.state = to;
        Ok(())
    }

    pub fn paint_background(&mut self) -> Result<()> {
        self.advance(PageState::Started, PageState::BackgroundPainted)?;
        if !matches!(self.page.background, PageBackground::Blank) {
            self.plan
                .ops
                .push(DrawOp::Background(self.page.background.clone()));
        }
        Ok(())
    }

    /// Pick the blocks to redraw and trim their masks around zones.
    pub fn plan_masks(&mut self) -> Result<()> {
        self.advance(PageState::BackgroundPainted, PageState::MasksPlanned)?;
        let page = self.page;

        for block in &page.blocks {
            let text = match block.rewritten_text.as_deref() {
                Some(text) if !text.trim().is_empty() => text,
                _ if self.options.redraw_original => block.text.as_str(),
                _ => continue,
            };
            if block.rotation != Rotation::Deg0 {
                log::debug!("Keeping rotated block {} ({}°)", block.id, block.rotation.degrees());
                continue;
            }
            if !block.bbox.is_valid() {
                log::warn!("{}", Error::block(&block.id, "degenerate bounding box"));
                continue;
            }
            match plan_mask(&block.bbox, &page.zones, self.options) {
                Some(mask) => self.candidates.push(Candidate { block, text, mask }),
                None => log::debug!("Block {} collides with a protected zone", block.id),
            }
        }
        Ok(())
    }

    /// Fit each candidate's text; emit its mask and then its text.
    pub fn render_text(&mut self) -> Result<()> {
        self.advance(PageState::MasksPlanned, PageState::TextRendered)?;

        for candidate in std::mem::take(&mut self.candidates) {
            let block = candidate.block;
            let markup = match self.markup.parse(&block.id, candidate.text, block.style) {
                Ok(markup) => markup,
                Err(e) => {
                    log::warn!("Skipping block: {}", e);
                    continue;
                }
            };

            let fitted = fit_text(&markup.text, markup.style, &block.bbox, self.options);
            let lines = fitted
                .lines
                .iter()
                .zip(fitted.baselines(block.bbox.y0))
                .map(|(text, baseline)| PlacedLine {
                    text: text.clone(),
                    x: block.bbox.x0,
                    baseline,
                })
                .collect();

            self.plan.ops.push(DrawOp::Mask(candidate.mask));
            self.plan.ops.push(DrawOp::Text(TextOp {
                block_id: block.id.clone(),
                font: fitted.font,
                size: fitted.size,
                lines,
                clip: fitted.overflow.then(|| block.bbox.expand(1.0)),
            }));
            self.drawn.push(block.bbox);
        }
        Ok(())
    }

    /// Re-create link annotations that were not painted over.
    pub fn restore_links(&mut self, pages: &BTreeSet<usize>) -> Result<()> {
        self.advance(PageState::TextRendered, PageState::LinksRestored)?;
        let page = self.page;

        for link in &page.links {
            if self
                .drawn
                .iter()
                .any(|bbox| link.from.overlap_ratio(bbox) > self.options.link_cover)
            {
                log::debug!("Dropping link covered by rewritten text at {:?}", link.from);
                continue;
            }
            let target = match &link.kind {
                LinkKind::Uri(uri) => LinkTarget::Uri(uri.clone()),
                LinkKind::GoTo { page_index } if pages.contains(page_index) => {
                    LinkTarget::Named(destination_name(*page_index))
                }
                LinkKind::GoTo { page_index } => {
                    log::warn!(
                        "Link on page {} targets missing page {}",
                        page.page_index,
                        page_index
                    );
                    continue;
                }
            };
            self.plan.ops.push(DrawOp::Link(LinkOp {
                rect: link.from.flip_y(page.height),
                target,
            }));
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<PagePlan> {
        self.advance(PageState::LinksRestored, PageState::PageClosed)?;
        Ok(self.plan)
    }
}

/// Run a page through every state. `pages` holds the indices present in the
/// output, for internal link targets.
pub fn plan_page(
    page: &PageLayout,
    pages: &BTreeSet<usize>,
    options: &BuildOptions,
    markup: &MarkupParser,
) -> Result<PagePlan> {
    let mut planner = PagePlanner::new(page, options, markup);
    planner.paint_background()?;
    planner.plan_masks()?;
    planner.render_text()?;
    planner.restore_links(pages)?;
    planner.close()
}
