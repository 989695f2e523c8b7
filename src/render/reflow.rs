//! Replacement text: semantic tags, word wrapping and font fitting.

use regex::Regex;

use super::metrics::{StandardFont, ASCENT};
use super::options::BuildOptions;
use crate::error::{Error, Result};
use crate::model::{BlockStyle, Rect};

/// Tags that carry a style.
const SEMANTIC_TAGS: [&str; 4] = ["h1", "h2", "h3", "caption"];

/// Inline tags stripped without changing the style.
const INLINE_TAGS: [&str; 10] = ["b", "i", "u", "em", "strong", "sup", "sub", "span", "p", "small"];

/// Slack for float comparisons when measuring.
const EPSILON: f32 = 0.01;

/// Smallest font size decrement the fitting search takes.
const MIN_FONT_STEP: f32 = 0.1;

/// Replacement text with its markup resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    pub style: BlockStyle,
    pub text: String,
}

/// Strips inline markup from rewritten text.
#[derive(Debug, Clone)]
pub struct MarkupParser {
    line_break: Regex,
    tag: Regex,
}

impl MarkupParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_break: Regex::new(r"(?i)<br\s*/?>")?,
            tag: Regex::new(&format!(
                r#"(?i)</?(?:{})(?:\s+[a-z][a-z0-9-]*\s*=\s*(?:"[^"]*"|'[^']*'))*\s*/?>"#,
                SEMANTIC_TAGS.iter().chain(INLINE_TAGS.iter()).copied().collect::<Vec<_>>().join("|")
            ))?,
        })
    }

    /// Resolve the style and plain text of `raw`.
    ///
    /// A semantic tag wrapping the whole text overrides `fallback`. Other
    /// known tags are dropped, `<br/>` becomes a newline. Anything else in
    /// angle brackets is kept as text. A semantic tag opened
    /// more often than closed is an error for block `block_id`.
    pub fn parse(&self, block_id: &str, raw: &str, fallback: BlockStyle) -> Result<Markup> {
        let mut text = raw.trim();

        for tag in SEMANTIC_TAGS {
            let opens = text.matches(&format!("<{}>", tag)).count();
            let closes = text.matches(&format!("</{}>", tag)).count();
            if opens > closes {
                return Err(Error::block(block_id, format!("unclosed <{}> tag", tag)));
            }
        }

        let mut style = fallback;
        for tag in SEMANTIC_TAGS {
            let open = format!("<{}>", tag);
            let close = format!("</{}>", tag);
            if text.len() >= open.len() + close.len()
                && text.starts_with(&open)
                && text.ends_with(&close)
            {
                text = &text[open.len()..text.len() - close.len()];
                if let Some(tagged) = BlockStyle::from_tag(tag) {
                    style = tagged;
                }
                break;
            }
        }

        let text = self.line_break.replace_all(text, "\n");
        let text = self.tag.replace_all(&text, "");
        let text = unescape(&text);

        Ok(Markup {
            style,
            text: text.trim().to_string(),
        })
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Wrap `text` into lines no wider than `max_width` points.
///
/// Newlines start a new paragraph. Words wider than a line are broken at
/// character boundaries.
pub fn wrap_text(text: &str, font: StandardFont, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }
    let space_width = font.text_width(" ", size);

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0f32;

        for word in paragraph.split_whitespace() {
            let word_width = font.text_width(word, size);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut chunk_width = 0.0f32;
                for c in word.chars() {
                    let char_width = font.text_width(c.encode_utf8(&mut [0; 4]), size);
                    if chunk_width + char_width > max_width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        chunk_width = 0.0;
                    }
                    current.push(c);
                    chunk_width += char_width;
                }
                current_width = chunk_width;
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space_width + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space_width + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }

        lines.push(current);
    }

    lines
}

/// Text wrapped at the size the fitting search settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    pub font: StandardFont,
    pub size: f32,
    /// Baseline-to-baseline distance
    pub line_height: f32,
    pub lines: Vec<String>,
    /// Still too large at the size floor; must be clipped
    pub overflow: bool,
}

impl FittedText {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Widest line in points.
    pub fn width(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| self.font.text_width(l, self.size))
            .fold(0.0, f32::max)
    }

    /// Baselines in top-left coordinates, first line top-aligned at `top`.
    pub fn baselines(&self, top: f32) -> impl Iterator<Item = f32> + '_ {
        let first = top + ASCENT * self.size;
        (0..self.lines.len()).map(move |i| first + i as f32 * self.line_height)
    }
}

/// Wrap `text` into `bbox`, shrinking from the style's nominal size by
/// `font_step` until it fits or the floor is reached.
pub fn fit_text(text: &str, style: BlockStyle, bbox: &Rect, options: &BuildOptions) -> FittedText {
    let styles = &options.styles;
    let font = styles.font(style);
    let nominal = styles.nominal_size(style);
    let floor = options.min_font_size.min(nominal);
    // A non-positive step never reaches the floor
    let step = if options.font_step.is_finite() {
        options.font_step.max(MIN_FONT_STEP)
    } else {
        MIN_FONT_STEP
    };
    let width = bbox.width();
    let height = bbox.height();

    let mut size = nominal;
    loop {
        let line_height = size * styles.leading;
        let lines = wrap_text(text, font, size, width);
        let fitted = FittedText {
            font,
            size,
            line_height,
            lines,
            overflow: false,
        };
        let overflow =
            fitted.height() > height + EPSILON || fitted.width() > width + EPSILON;

        if !overflow || size - step < floor - EPSILON {
            if overflow {
                log::debug!(
                    "Text needs {:.1}pt but box has {:.1}pt at {:.1}pt font; clipping",
                    fitted.height(),
                    height,
                    size
                );
            }
            return FittedText { overflow, ..fitted };
        }
        size = (size - step).max(floor);
    }
}
