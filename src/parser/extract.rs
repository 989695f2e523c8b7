//! Geometry extraction from PDF content streams.
//!
//! The interpreter walks a page's operators tracking the graphics and text
//! state, and emits one [`TextSpan`] per text-showing operator with a
//! top-left-origin bounding box. Spans are then grouped into lines and
//! lines into [`RawBlock`]s, column by column.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue,
    ResourceScope,
};
use crate::error::Result;
use crate::model::{BlockStyle, Rect, Rotation, TextBlock};

/// Fraction of the font size above the baseline covered by glyphs.
const GLYPH_ASCENT: f32 = 0.8;
/// Fraction of the font size below the baseline covered by glyphs.
const GLYPH_DESCENT: f32 = 0.2;

/// Body size used when a document has no text at all.
pub const DEFAULT_BODY_SIZE: f32 = 11.0;

/// A text span with position and style information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content, NFKC-normalized
    pub text: String,
    /// Glyph box, top-left origin
    pub bbox: Rect,
    /// Start of the baseline, top-left origin
    pub origin: (f32, f32),
    /// Length of the span along its writing direction
    pub advance: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    pub is_bold: bool,
    pub is_italic: bool,
    /// Unit writing direction, top-left space
    pub direction: (f32, f32),
}

impl TextSpan {
    pub fn rotation(&self) -> Rotation {
        Rotation::from_direction(self.direction.0, self.direction.1)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Canonical reading axis and line-advance axis for a rotation.
fn axes(rotation: Rotation) -> ((f32, f32), (f32, f32)) {
    let dir = match rotation {
        Rotation::Deg0 => (1.0, 0.0),
        Rotation::Deg90 => (0.0, -1.0),
        Rotation::Deg180 => (-1.0, 0.0),
        Rotation::Deg270 => (0.0, 1.0),
    };
    (dir, (-dir.1, dir.0))
}

/// Position of a span along the reading axis (`u`) and across it (`v`).
fn span_coords(span: &TextSpan, rotation: Rotation) -> (f32, f32) {
    let (dir, normal) = axes(rotation);
    let (x, y) = span.origin;
    (x * dir.0 + y * dir.1, x * normal.0 + y * normal.1)
}

/// A text line composed of spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Spans sorted along the reading direction
    pub spans: Vec<TextSpan>,
    pub bbox: Rect,
    pub rotation: Rotation,
    /// Baseline position across the reading axis
    pub position: f32,
    /// Leading edge along the reading axis
    pub start: f32,
    /// Character-weighted font size
    pub font_size: f32,
}

impl TextLine {
    /// Create a line from spans already sorted along `rotation`'s axis.
    pub fn from_spans(spans: Vec<TextSpan>, rotation: Rotation) -> Self {
        let bbox = spans
            .iter()
            .skip(1)
            .fold(spans.first().map(|s| s.bbox).unwrap_or_default(), |acc, s| {
                acc.union(&s.bbox)
            });
        let (start, position) = spans
            .first()
            .map(|s| span_coords(s, rotation))
            .unwrap_or_default();
        let font_size = weighted_size(&spans);
        Self {
            spans,
            bbox,
            rotation,
            position,
            start,
            font_size,
        }
    }

    /// Combined text of all spans, with spaces inserted at visual gaps.
    ///
    /// No space is inserted between characters of scripts that don't use
    /// word spaces.
    pub fn text(&self) -> String {
        let mut result = String::new();
        let mut prev_end: Option<f32> = None;

        for span in &self.spans {
            let (u, _) = span_coords(span, self.rotation);
            if let Some(end) = prev_end {
                let chars = span.char_count();
                let avg_char_width = if chars > 0 && span.advance > 0.0 {
                    span.advance / chars as f32
                } else {
                    span.font_size * 0.5
                };
                let gap = u - end;
                let prev_last = result.chars().last();
                let curr_first = span.text.chars().next();
                let both_spaceless = prev_last.is_some_and(is_spaceless_script_char)
                    && curr_first.is_some_and(is_spaceless_script_char);
                let has_space = prev_last.is_some_and(char::is_whitespace)
                    || curr_first.is_some_and(char::is_whitespace);

                if gap > avg_char_width * 0.2 && !both_spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
            prev_end = Some(u + span.advance);
        }

        result
    }

    fn end(&self) -> f32 {
        self.spans
            .last()
            .map(|s| span_coords(s, self.rotation).0 + s.advance)
            .unwrap_or(self.start)
    }
}

/// A group of lines forming one pre-filter text block.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub lines: Vec<TextLine>,
    pub bbox: Rect,
}

impl RawBlock {
    fn new(line: TextLine) -> Self {
        Self {
            bbox: line.bbox,
            lines: vec![line],
        }
    }

    fn push(&mut self, line: TextLine) {
        self.bbox = self.bbox.union(&line.bbox);
        self.lines.push(line);
    }

    fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }

    /// Lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Lines joined with spaces, as seen by the math heuristic.
    pub fn flat_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    /// Distinct lowercase font names used by the block.
    pub fn font_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.spans().map(|s| s.font_name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Character-weighted average size of non-empty spans.
    pub fn font_size(&self) -> f32 {
        let spans: Vec<TextSpan> = self.spans().filter(|s| s.has_text()).cloned().collect();
        weighted_size(&spans)
    }

    /// Bold when at least half of the non-empty spans are bold.
    pub fn is_bold(&self) -> bool {
        let (bold, total) = self
            .spans()
            .filter(|s| s.has_text())
            .fold((0usize, 0usize), |(b, t), s| (b + usize::from(s.is_bold), t + 1));
        total > 0 && bold * 2 >= total
    }

    /// Rotation of the first line's first span.
    pub fn rotation(&self) -> Rotation {
        self.lines
            .first()
            .and_then(|l| l.spans.first())
            .map(TextSpan::rotation)
            .unwrap_or_default()
    }

    /// Turn into a model block with style relative to the body size.
    pub fn into_text_block(self, id: String, body_size: f32) -> TextBlock {
        let font_size = self.font_size();
        let font_size = if font_size > 0.0 { font_size } else { body_size };
        TextBlock {
            id,
            bbox: self.bbox,
            text: self.text(),
            rewritten_text: None,
            style: BlockStyle::from_relative_size(font_size, body_size),
            font_size,
            is_bold: self.is_bold(),
            rotation: self.rotation(),
        }
    }
}

fn weighted_size(spans: &[TextSpan]) -> f32 {
    let total_chars: usize = spans.iter().map(|s| s.char_count()).sum();
    if total_chars == 0 {
        return spans.first().map(|s| s.font_size).unwrap_or(0.0);
    }
    let weighted: f32 = spans
        .iter()
        .map(|s| s.font_size * s.char_count() as f32)
        .sum();
    weighted / total_chars as f32
}

/// Font size histogram for the document's body size.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Span counts per 0.1pt bin
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Count every non-empty span.
    pub fn add_spans(&mut self, spans: &[TextSpan]) {
        for span in spans.iter().filter(|s| s.has_text()) {
            self.add_size(span.font_size);
        }
    }

    pub fn merge(mut self, other: FontStatistics) -> Self {
        for (key, count) in other.size_histogram {
            *self.size_histogram.entry(key).or_insert(0) += count;
        }
        self
    }

    /// Most common size; ties go to the smaller size.
    pub fn body_size(&self) -> f32 {
        self.size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(key, _)| *key as f32 / 10.0)
            .unwrap_or(DEFAULT_BODY_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Content stream interpreter
// ---------------------------------------------------------------------------

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub(crate) const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[PdfValue]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut v = [0.0f32; 6];
        for (slot, op) in v.iter_mut().zip(operands) {
            *slot = get_number_from_value(op)?;
        }
        Some(Self::from(v))
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix::new(
            self.a * other.a + self.b * other.c,
            self.a * other.b + self.b * other.d,
            self.c * other.a + self.d * other.c,
            self.c * other.b + self.d * other.d,
            self.e * other.a + self.f * other.c + other.e,
            self.e * other.b + self.f * other.d + other.f,
        )
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn apply_vector(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y, self.b * x + self.d * y)
    }
}

impl From<[f32; 6]> for Matrix {
    fn from(m: [f32; 6]) -> Self {
        Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

/// Graphics state, including the text state parameters.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// `Tz / 100`
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Interprets one page's content into spans.
pub struct ContentInterpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page_box: Rect,
    max_depth: usize,
    fonts: HashMap<ResourceScope, HashMap<Vec<u8>, Arc<BackendFontInfo>>>,
    spans: Vec<TextSpan>,
}

impl<'a, B: PdfBackend + ?Sized> ContentInterpreter<'a, B> {
    pub fn new(backend: &'a B, page_box: Rect, max_depth: usize) -> Self {
        Self {
            backend,
            page_box,
            max_depth,
            fonts: HashMap::new(),
            spans: Vec::new(),
        }
    }

    /// Interpret a page and return its spans in content order.
    pub fn run_page(mut self, page: PageId) -> Result<Vec<TextSpan>> {
        let content = self.backend.page_content(page)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let ops = self.backend.decode_content(&content)?;
        self.run(&ops, ResourceScope::Page(page), 0, GraphicsState::default());
        Ok(self.spans)
    }

    fn font(&mut self, scope: ResourceScope, name: &[u8]) -> Arc<BackendFontInfo> {
        let backend = self.backend;
        let fonts = self.fonts.entry(scope).or_insert_with(|| {
            match backend.fonts(scope) {
                Ok(list) => list
                    .into_iter()
                    .map(|f| (f.name.clone(), Arc::new(f)))
                    .collect(),
                Err(e) => {
                    log::warn!("Failed to read fonts: {}", e);
                    HashMap::new()
                }
            }
        });
        fonts
            .entry(name.to_vec())
            .or_insert_with(|| Arc::new(BackendFontInfo::fallback(name)))
            .clone()
    }

    fn run(&mut self, ops: &[ContentOp], scope: ResourceScope, depth: usize, mut gs: GraphicsState) {
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut in_text_block = false;

        for op in ops {
            let num = |i: usize| op.operands.get(i).and_then(get_number_from_value);
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        gs.font = Some(name.clone());
                    }
                    gs.font_size = num(1).unwrap_or(gs.font_size);
                }
                "Tc" => gs.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => gs.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => gs.h_scale = num(0).unwrap_or(100.0) / 100.0,
                "TL" => gs.leading = num(0).unwrap_or(0.0),
                "Ts" => gs.rise = num(0).unwrap_or(0.0),
                "Td" | "TD" => {
                    let tx = num(0).unwrap_or(0.0);
                    let ty = num(1).unwrap_or(0.0);
                    if op.operator == "TD" {
                        gs.leading = -ty;
                    }
                    tlm = Matrix::translation(tx, ty).then(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(&op.operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" if in_text_block => {
                    tm = self.show(&op.operands[..op.operands.len().min(1)], scope, &gs, tm);
                }
                "TJ" if in_text_block => {
                    if let Some(PdfValue::Array(parts)) = op.operands.first() {
                        tm = self.show(parts, scope, &gs, tm);
                    }
                }
                "'" | "\"" if in_text_block => {
                    let text_idx = if op.operator == "\"" {
                        gs.word_spacing = num(0).unwrap_or(gs.word_spacing);
                        gs.char_spacing = num(1).unwrap_or(gs.char_spacing);
                        2
                    } else {
                        0
                    };
                    tlm = Matrix::translation(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    if let Some(part) = op.operands.get(text_idx) {
                        tm = self.show(std::slice::from_ref(part), scope, &gs, tm);
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.run_form(name, scope, depth, &gs);
                    }
                }
                _ => {}
            }
        }
    }

    fn run_form(&mut self, name: &[u8], scope: ResourceScope, depth: usize, gs: &GraphicsState) {
        if depth >= self.max_depth {
            log::debug!(
                "Form XObject nesting deeper than {}, skipping /{}",
                self.max_depth,
                String::from_utf8_lossy(name)
            );
            return;
        }
        let Some(form) = self.backend.form_xobject(scope, name) else {
            return;
        };
        let ops = match self.backend.decode_content(&form.content) {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("Skipping undecodable form XObject: {}", e);
                return;
            }
        };
        let form_scope = if form.has_resources {
            ResourceScope::Form(form.id)
        } else {
            scope
        };
        let mut form_gs = gs.clone();
        form_gs.ctm = Matrix::from(form.matrix).then(&gs.ctm);
        self.run(&ops, form_scope, depth + 1, form_gs);
    }

    /// Show strings and kerning adjustments; returns the advanced text matrix.
    fn show(
        &mut self,
        parts: &[PdfValue],
        scope: ResourceScope,
        gs: &GraphicsState,
        tm: Matrix,
    ) -> Matrix {
        let font_key = gs.font.clone().unwrap_or_default();
        let font = self.font(scope, &font_key);

        let mut text = String::new();
        let mut advance = 0.0f32;
        // Adjustments beyond this many 1/1000 em read as word breaks
        let space_threshold = 200.0;

        for part in parts {
            match part {
                PdfValue::Str(bytes) => {
                    text.push_str(&self.backend.decode_text(&font, bytes));
                    for code in font.codes(bytes) {
                        let w0 = font.glyph_width(code) / 1000.0;
                        let mut tx = w0 * gs.font_size + gs.char_spacing;
                        if !font.two_byte && code == 32 {
                            tx += gs.word_spacing;
                        }
                        advance += tx * gs.h_scale;
                    }
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let n = get_number_from_value(part).unwrap_or(0.0);
                    advance -= n / 1000.0 * gs.font_size * gs.h_scale;
                    if -n > space_threshold
                        && !text.is_empty()
                        && !text.ends_with(char::is_whitespace)
                        && !text.chars().last().is_some_and(is_spaceless_script_char)
                    {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }

        if text.trim().is_empty() {
            return Matrix::translation(advance, 0.0).then(&tm);
        }

        let combined = tm.then(&gs.ctm);
        let bottom = gs.rise - GLYPH_DESCENT * gs.font_size;
        let top = gs.rise + GLYPH_ASCENT * gs.font_size;
        let corners: Vec<(f32, f32)> = [(0.0, bottom), (advance, bottom), (0.0, top), (advance, top)]
            .iter()
            .map(|&(x, y)| self.to_top_left(combined.apply(x, y)))
            .collect();

        let (dx, dy) = combined.apply_vector(1.0, 0.0);
        let x_scale = (dx * dx + dy * dy).sqrt();
        let (vx, vy) = combined.apply_vector(0.0, 1.0);
        let y_scale = (vx * vx + vy * vy).sqrt();
        let direction = if x_scale > 0.0 {
            (dx / x_scale, -dy / x_scale)
        } else {
            (1.0, 0.0)
        };

        let origin = self.to_top_left(combined.apply(0.0, gs.rise));
        if let Some(bbox) = Rect::from_points(&corners) {
            self.spans.push(TextSpan {
                text: text.nfkc().collect(),
                bbox,
                origin,
                advance: (advance * x_scale).abs(),
                font_size: gs.font_size * y_scale,
                font_name: font.base_font.clone(),
                is_bold: font.is_bold,
                is_italic: font.is_italic,
                direction,
            });
        }

        Matrix::translation(advance, 0.0).then(&tm)
    }

    fn to_top_left(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x - self.page_box.x0, self.page_box.y1 - y)
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group a page's spans into blocks: by direction, then by column, then
/// into lines and blocks.
pub fn group_spans(spans: Vec<TextSpan>) -> Vec<RawBlock> {
    let mut by_rotation: BTreeMap<u16, (Rotation, Vec<TextSpan>)> = BTreeMap::new();
    for span in spans.into_iter().filter(TextSpan::has_text) {
        let rotation = span.rotation();
        by_rotation
            .entry(rotation.degrees())
            .or_insert_with(|| (rotation, Vec::new()))
            .1
            .push(span);
    }

    let mut blocks = Vec::new();
    for (_, (rotation, spans)) in by_rotation {
        let gutter = if rotation.is_upright() {
            detect_gutter(&spans)
        } else {
            None
        };
        let columns = match gutter {
            Some(gutter) => {
                log::debug!("Splitting columns at x={:.1}", gutter);
                let (left, right): (Vec<_>, Vec<_>) = spans
                    .into_iter()
                    .partition(|s| (s.bbox.x0 + s.bbox.x1) / 2.0 < gutter);
                vec![left, right]
            }
            None => vec![spans],
        };
        for column in columns {
            let lines = group_into_lines(column, rotation);
            blocks.extend(group_into_blocks(lines));
        }
    }
    blocks
}

/// Spans sharing a baseline (within 30% of the font size) and closer than
/// one em along it form a line.
fn group_into_lines(mut spans: Vec<TextSpan>, rotation: Rotation) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        let (ua, va) = span_coords(a, rotation);
        let (ub, vb) = span_coords(b, rotation);
        va.total_cmp(&vb).then(ua.total_cmp(&ub))
    });

    // Baseline clusters
    let mut clusters: Vec<Vec<TextSpan>> = Vec::new();
    let mut cluster_v: Option<f32> = None;
    for span in spans {
        let (_, v) = span_coords(&span, rotation);
        let tolerance = span.font_size * 0.3;
        match clusters.last_mut() {
            Some(cluster) if cluster_v.is_some_and(|cv| (v - cv).abs() <= tolerance) => {
                cluster.push(span)
            }
            _ => {
                cluster_v = Some(v);
                clusters.push(vec![span]);
            }
        }
    }

    let mut lines = Vec::new();
    for mut cluster in clusters {
        cluster.sort_by(|a, b| span_coords(a, rotation).0.total_cmp(&span_coords(b, rotation).0));
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_end = 0.0f32;
        for span in cluster {
            let (u, _) = span_coords(&span, rotation);
            let em = span
                .font_size
                .max(current.last().map(|s| s.font_size).unwrap_or(0.0));
            if !current.is_empty() && u - current_end >= em {
                lines.push(TextLine::from_spans(std::mem::take(&mut current), rotation));
            }
            current_end = if current.is_empty() {
                u + span.advance
            } else {
                current_end.max(u + span.advance)
            };
            current.push(span);
        }
        if !current.is_empty() {
            lines.push(TextLine::from_spans(current, rotation));
        }
    }
    lines
}

/// Average distance between successive distinct baselines.
fn avg_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| w[1].position - w[0].position)
        .filter(|s| *s > 0.1)
        .collect();
    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

/// Attach each line to an open block whose last line sits directly above
/// it with a similar left edge and font size.
fn group_into_blocks(lines: Vec<TextLine>) -> Vec<RawBlock> {
    let avg_spacing = avg_line_spacing(&lines);
    let mut blocks: Vec<RawBlock> = Vec::new();

    for line in lines {
        let target = blocks.iter().rposition(|block| {
            block
                .lines
                .last()
                .is_some_and(|prev| continues_block(prev, &line, avg_spacing))
        });
        match target {
            Some(i) => blocks[i].push(line),
            None => blocks.push(RawBlock::new(line)),
        }
    }
    blocks
}

fn continues_block(prev: &TextLine, line: &TextLine, avg_spacing: f32) -> bool {
    let spacing = line.position - prev.position;
    prev.rotation == line.rotation
        && spacing > 0.1
        && spacing <= avg_spacing * 1.5
        && (line.start - prev.start).abs() <= 20.0
        && (line.font_size - prev.font_size).abs() <= 1.0
        // The new line must not start past the end of the previous one
        && line.start <= prev.end()
}

/// Find the gutter of a two-column page, if there is one.
///
/// Looks for the widest run of empty 3pt vertical slices in the middle 70%
/// of the text extent, preferring runs near the center.
fn detect_gutter(spans: &[TextSpan]) -> Option<f32> {
    let min_x = spans.iter().map(|s| s.bbox.x0).reduce(f32::min)?;
    let max_x = spans.iter().map(|s| s.bbox.x1).reduce(f32::max)?;
    let extent = max_x - min_x;
    if extent < 250.0 {
        return None;
    }

    let slice_width = 3.0;
    let num_slices = (extent / slice_width) as usize + 1;
    let mut occupancy = vec![0usize; num_slices];
    for span in spans {
        let start = ((span.bbox.x0 - min_x) / slice_width) as usize;
        let end = (((span.bbox.x1 - min_x) / slice_width) as usize).min(num_slices - 1);
        for slot in occupancy.iter_mut().take(end + 1).skip(start) {
            *slot += 1;
        }
    }

    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let center = num_slices as f32 / 2.0;

    // Runs of empty slices as (start, len)
    let mut runs = Vec::new();
    let mut run_start = None;
    for (i, &count) in occupancy
        .iter()
        .enumerate()
        .take(search_end)
        .skip(search_start)
    {
        match (count, run_start) {
            (0, None) => run_start = Some(i),
            (0, Some(_)) => {}
            (_, Some(s)) => {
                runs.push((s, i - s));
                run_start = None;
            }
            (_, None) => {}
        }
    }
    if let Some(s) = run_start {
        runs.push((s, search_end - s));
    }

    let mut best: Option<(usize, usize, f32)> = None;
    for (start, len) in runs {
        let width = len as f32 * slice_width;
        if width < 10.0 {
            continue;
        }
        let center_dist = ((start + len / 2) as f32 - center).abs();
        let better = match best {
            None => true,
            Some((_, best_len, best_dist)) => {
                let best_width = best_len as f32 * slice_width;
                width > best_width * 1.5 || (width >= best_width * 0.7 && center_dist < best_dist)
            }
        };
        if better {
            best = Some((start, len, center_dist));
        }
    }

    let (start, len, _) = best?;
    if (len as f32 * slice_width) < 12.0 {
        return None;
    }
    let gutter = min_x + (start as f32 + len as f32 / 2.0) * slice_width;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        log::debug!("Column too narrow, treating as single column");
        return None;
    }

    let left = spans
        .iter()
        .filter(|s| (s.bbox.x0 + s.bbox.x1) / 2.0 < gutter)
        .count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        log::debug!("Spans too imbalanced, treating as single column");
        return None;
    }
    Some(gutter)
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Upright span whose baseline starts at `(x, y)` in top-left space.
    pub(crate) fn span(text: &str, x: f32, y: f32, size: f32) -> TextSpan {
        let advance = text.chars().count() as f32 * size * 0.5;
        TextSpan {
            text: text.to_string(),
            bbox: Rect::new(x, y - size * GLYPH_ASCENT, x + advance, y + size * GLYPH_DESCENT),
            origin: (x, y),
            advance,
            font_size: size,
            font_name: "Helvetica".to_string(),
            is_bold: false,
            is_italic: false,
            direction: (1.0, 0.0),
        }
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 20.0);
        // Scale first, then shift
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 22.0));
        // Shift first, then scale
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 42.0));
        assert_eq!(Matrix::IDENTITY.then(&shift), shift);
    }

    #[test]
    fn test_font_statistics_mode() {
        let mut stats = FontStatistics::default();
        for _ in 0..100 {
            stats.add_size(10.0);
        }
        for _ in 0..5 {
            stats.add_size(18.0);
        }
        assert!((stats.body_size() - 10.0).abs() < 1e-4);
        assert_eq!(FontStatistics::default().body_size(), DEFAULT_BODY_SIZE);

        let mut more = FontStatistics::default();
        for _ in 0..200 {
            more.add_size(9.96);
        }
        let merged = stats.merge(more);
        assert!((merged.body_size() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_line_text_inserts_spaces() {
        let line = TextLine::from_spans(
            vec![span("Hello", 72.0, 100.0, 10.0), span("world", 102.0, 100.0, 10.0)],
            Rotation::Deg0,
        );
        assert_eq!(line.text(), "Hello world");

        let tight = TextLine::from_spans(
            vec![span("Hel", 72.0, 100.0, 10.0), span("lo", 87.0, 100.0, 10.0)],
            Rotation::Deg0,
        );
        assert_eq!(tight.text(), "Hello");
    }

    #[test]
    fn test_group_lines_and_blocks() {
        let spans = vec![
            span("First line of a", 72.0, 100.0, 10.0),
            span("paragraph", 150.0, 100.5, 10.0),
            span("second line here", 72.0, 112.0, 10.0),
            span("Far away", 72.0, 300.0, 10.0),
        ];
        let blocks = group_spans(spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines.len(), 2);
        assert_eq!(
            blocks[0].text(),
            "First line of a paragraph\nsecond line here"
        );
        assert_eq!(blocks[1].text(), "Far away");
    }

    #[test]
    fn test_size_change_breaks_block() {
        let spans = vec![
            span("A Heading", 72.0, 100.0, 16.0),
            span("body text follows", 72.0, 114.0, 10.0),
            span("more body text", 72.0, 126.0, 10.0),
        ];
        let blocks = group_spans(spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), "A Heading");
    }

    #[test]
    fn test_two_columns_split() {
        let mut spans = Vec::new();
        for i in 0..10 {
            let y = 100.0 + i as f32 * 12.0;
            spans.push(span("left column text xx", 50.0, y, 10.0));
            spans.push(span("right column text x", 320.0, y, 10.0));
        }
        let blocks = group_spans(spans);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.lines.len() == 10));
        assert!(blocks[0].bbox.x1 < blocks[1].bbox.x0);
    }

    #[test]
    fn test_block_style_and_weight() {
        let mut bold = span("Bold", 72.0, 100.0, 20.0);
        bold.is_bold = true;
        let regular = span("Text", 100.0, 100.0, 20.0);
        let block = RawBlock::new(TextLine::from_spans(vec![bold, regular], Rotation::Deg0));
        assert!(block.is_bold());

        let tb = block.into_text_block("block_0".into(), 10.0);
        assert_eq!(tb.style, BlockStyle::H1);
        assert_eq!(tb.font_size, 20.0);
        assert_eq!(tb.rotation, Rotation::Deg0);
    }

    #[test]
    fn test_vertical_spans_group_separately() {
        let mut up = span("Rotated label", 20.0, 400.0, 10.0);
        up.direction = (0.0, -1.0);
        let blocks = group_spans(vec![up, span("Normal", 72.0, 100.0, 10.0)]);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().any(|b| b.rotation() == Rotation::Deg90));
    }

    #[test]
    fn test_single_column_narrow_page() {
        let spans = vec![span("short", 50.0, 100.0, 10.0), span("text", 200.0, 100.0, 10.0)];
        assert!(detect_gutter(&spans).is_none());
    }
}
