//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the PDF operations the geometry
//! extractor needs, isolating the concrete PDF library (lopdf) from the
//! content stream interpreter.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::{LinkKind, Rect, Rotation};
use crate::render::metrics;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Where resource names (fonts, XObjects) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    /// The page's own (possibly inherited) resources.
    Page(PageId),
    /// Resources of a form XObject.
    Form(ObjectId),
}

/// Where a font dictionary lives, so text can be decoded without
/// walking the resources again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontLocation {
    /// Indirect object.
    Object(ObjectId),
    /// Inline in the resource dictionary of a scope.
    Inline(ResourceScope),
    /// Not found in the resources.
    Unknown,
}

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the resource font dictionary).
    pub name: Vec<u8>,
    pub location: FontLocation,
    /// Base font name with any subset prefix removed (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// Name, descriptor flags or weight say bold.
    pub is_bold: bool,
    pub is_italic: bool,
    /// Composite fonts use two-byte codes.
    pub two_byte: bool,
    /// Glyph advances in 1/1000 em, keyed by character code.
    pub widths: HashMap<u32, f32>,
    /// Advance for codes missing from `widths`.
    pub default_width: f32,
}

impl BackendFontInfo {
    /// Font with no metrics; every glyph advances half an em.
    pub fn fallback(name: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            location: FontLocation::Unknown,
            base_font: String::from_utf8_lossy(name).to_string(),
            is_bold: false,
            is_italic: false,
            two_byte: false,
            widths: HashMap::new(),
            default_width: 500.0,
        }
    }

    /// Advance of `code` in 1/1000 em.
    pub fn glyph_width(&self, code: u32) -> f32 {
        self.widths
            .get(&code)
            .copied()
            .unwrap_or(self.default_width)
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }
}

/// A form XObject referenced by a `Do` operator.
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub id: ObjectId,
    /// Decoded content stream
    pub content: Vec<u8>,
    /// Form matrix, identity when absent
    pub matrix: [f32; 6],
    /// Whether the form declares its own resources
    pub has_resources: bool,
}

/// A link annotation in PDF user space (bottom-left origin).
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub rect: Rect,
    pub kind: LinkKind,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, geometry, fonts, content
/// stream decoding and annotations without exposing concrete PDF library
/// types. `Sync` so pages can be interpreted in parallel.
pub trait PdfBackend: Sync {
    /// Return all pages as (page_number → PageId), page numbers 1-based.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page box in PDF user space (MediaBox, inherited if needed).
    fn page_box(&self, page: PageId) -> Rect;

    /// Visible area in PDF user space (CropBox clipped to the page box),
    /// `None` when it covers the whole page box.
    fn crop_box(&self, page: PageId) -> Option<Rect>;

    /// Display rotation (`/Rotate`, inherited if needed).
    fn rotation(&self, page: PageId) -> Rotation;

    /// Fonts available in a resource scope.
    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the encoding of `font`, as returned
    /// by [`PdfBackend::fonts`]. Falls back to simple decoding if the font or
    /// encoding is unavailable.
    fn decode_text(&self, font: &BackendFontInfo, bytes: &[u8]) -> String;

    /// Look up a form XObject by resource name. Images and unknown names yield `None`.
    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Option<FormXObject>;

    /// Link annotations of a page with resolved targets.
    fn page_links(&self, page: PageId) -> Vec<RawLink>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

/// Strip a subset tag such as `ABCDEF+` from a font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Bold by name: bold, black, heavy or semibold.
pub fn is_bold_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["bold", "black", "heavy", "semibold"]
        .iter()
        .any(|k| lower.contains(k))
}

fn is_italic_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("italic") || lower.contains("oblique")
}

const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

// ---------------------------------------------------------------------------
// LopdfBackend: implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: Arc<LopdfDocument>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        crate::detect::detect_format_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc: Arc::new(doc) })
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        Self { doc: Arc::new(doc) }
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Shared handle on the document, attached to the extracted layout.
    pub fn shared_doc(&self) -> Arc<LopdfDocument> {
        Arc::clone(&self.doc)
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    fn dict_entry<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        dict.get(key).ok().and_then(|o| self.resolve(o))
    }

    /// Walk up the page tree until `key` is found.
    fn inherited<'a>(&'a self, page: PageId, key: &[u8]) -> Option<&'a Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..32 {
            if let Some(obj) = self.dict_entry(dict, key) {
                return Some(obj);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn form_stream(&self, id: ObjectId) -> Option<&Stream> {
        match self.doc.get_object(id).ok()? {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    fn scope_resources(&self, scope: ResourceScope) -> Option<&Dictionary> {
        match scope {
            ResourceScope::Page(page) => self
                .inherited(page, b"Resources")
                .and_then(|o| o.as_dict().ok()),
            ResourceScope::Form(id) => {
                let stream = self.form_stream(id)?;
                self.dict_entry(&stream.dict, b"Resources")
                    .and_then(|o| o.as_dict().ok())
            }
        }
    }

    /// Font dictionaries of a scope with their locations.
    fn scope_font_dicts(&self, scope: ResourceScope) -> BTreeMap<Vec<u8>, (&Dictionary, FontLocation)> {
        let mut fonts = BTreeMap::new();
        if let Some(font_res) = self
            .scope_resources(scope)
            .and_then(|r| self.dict_entry(r, b"Font"))
            .and_then(|o| o.as_dict().ok())
        {
            for (name, obj) in font_res.iter() {
                let location = match obj {
                    Object::Reference(id) => FontLocation::Object(*id),
                    _ => FontLocation::Inline(scope),
                };
                if let Some(dict) = self.resolve_dict(obj) {
                    fonts.insert(name.clone(), (dict, location));
                }
            }
        }
        fonts
    }

    fn font_info(&self, name: &[u8], font: &Dictionary, location: FontLocation) -> BackendFontInfo {
        let raw_name = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(name).to_string());
        let base_font = strip_subset_prefix(&raw_name).to_string();

        let two_byte = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Type0");

        let descendant = if two_byte {
            self.dict_entry(font, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .and_then(|o| self.resolve_dict(o))
        } else {
            None
        };

        let descriptor = self
            .dict_entry(descendant.unwrap_or(font), b"FontDescriptor")
            .and_then(|o| o.as_dict().ok());
        let flags = descriptor
            .and_then(|d| d.get(b"Flags").ok())
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let weight = descriptor
            .and_then(|d| d.get(b"FontWeight").ok())
            .and_then(|o| o.as_float().ok())
            .unwrap_or(400.0);
        let italic_angle = descriptor
            .and_then(|d| d.get(b"ItalicAngle").ok())
            .and_then(|o| o.as_float().ok())
            .unwrap_or(0.0);

        let is_bold = is_bold_name(&base_font) || flags & FLAG_FORCE_BOLD != 0 || weight >= 600.0;
        let is_italic = is_italic_name(&base_font) || flags & FLAG_ITALIC != 0 || italic_angle != 0.0;

        let (widths, default_width) = match descendant {
            Some(cid_font) => self.cid_widths(cid_font),
            None => self.simple_widths(font, &base_font),
        };

        BackendFontInfo {
            name: name.to_vec(),
            location,
            base_font,
            is_bold,
            is_italic,
            two_byte,
            widths,
            default_width,
        }
    }

    fn simple_widths(&self, font: &Dictionary, base_font: &str) -> (HashMap<u32, f32>, f32) {
        let mut widths = HashMap::new();
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        if let Some(array) = self.dict_entry(font, b"Widths").and_then(|o| o.as_array().ok()) {
            for (i, w) in array.iter().enumerate() {
                if let Some(w) = self.resolve(w).and_then(|o| o.as_float().ok()) {
                    widths.insert(first_char + i as u32, w);
                }
            }
            return (widths, 500.0);
        }

        // Standard 14 fonts usually ship without /Widths
        if let Some(table) = metrics::standard_widths(base_font) {
            for code in 32u32..=126 {
                widths.insert(code, table[(code - 32) as usize] as f32);
            }
        }
        (widths, 500.0)
    }

    /// Parse `/DW` and the `/W` array of a CIDFont.
    fn cid_widths(&self, cid_font: &Dictionary) -> (HashMap<u32, f32>, f32) {
        let default_width = cid_font
            .get(b"DW")
            .ok()
            .and_then(|o| o.as_float().ok())
            .unwrap_or(1000.0);
        let mut widths = HashMap::new();
        let Some(w) = self.dict_entry(cid_font, b"W").and_then(|o| o.as_array().ok()) else {
            return (widths, default_width);
        };

        let mut i = 0;
        while i < w.len() {
            let Some(first) = w[i].as_i64().ok() else {
                break;
            };
            // CIDs are non-negative; malformed entries are skipped whole
            let start = u32::try_from(first).ok();
            match w.get(i + 1).and_then(|o| self.resolve(o)) {
                Some(Object::Array(list)) => {
                    if let Some(start) = start {
                        for (k, v) in list.iter().enumerate() {
                            if let (Ok(v), Some(cid)) = (v.as_float(), start.checked_add(k as u32)) {
                                widths.insert(cid, v);
                            }
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = last.as_i64().ok().and_then(|l| u32::try_from(l).ok());
                    let width = w.get(i + 2).and_then(|o| o.as_float().ok());
                    if let (Some(start), Some(last), Some(width)) = (start, last, width) {
                        for cid in start..=last.min(start.saturating_add(0xFFFF)) {
                            widths.insert(cid, width);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
        (widths, default_width)
    }

    fn page_index_of(&self, target: ObjectId) -> Option<usize> {
        self.doc
            .get_pages()
            .values()
            .position(|id| *id == target)
    }

    /// Resolve an explicit or named destination to a 0-based page index.
    fn resolve_destination(&self, dest: &Object, depth: usize) -> Option<usize> {
        if depth > 4 {
            return None;
        }
        match self.resolve(dest)? {
            Object::Array(array) => {
                let first = array.first()?;
                match first {
                    Object::Reference(page_ref) => self.page_index_of(*page_ref),
                    // Remote-style integer page numbers
                    Object::Integer(n) if *n >= 0 => Some(*n as usize),
                    _ => None,
                }
            }
            Object::Dictionary(d) => self.resolve_destination(d.get(b"D").ok()?, depth + 1),
            Object::Name(name) => self.resolve_named_destination(name, depth),
            Object::String(name, _) => self.resolve_named_destination(name, depth),
            _ => None,
        }
    }

    fn resolve_named_destination(&self, name: &[u8], depth: usize) -> Option<usize> {
        let catalog = self.doc.catalog().ok()?;

        if let Some(dests) = self.dict_entry(catalog, b"Dests").and_then(|o| o.as_dict().ok()) {
            if let Ok(dest) = dests.get(name) {
                return self.resolve_destination(dest, depth + 1);
            }
        }

        let tree = self
            .dict_entry(catalog, b"Names")
            .and_then(|o| o.as_dict().ok())
            .and_then(|names| self.dict_entry(names, b"Dests"))
            .and_then(|o| o.as_dict().ok())?;
        let mut visited = HashSet::new();
        let dest = self.lookup_name_tree(tree, name, &mut visited)?;
        self.resolve_destination(dest, depth + 1)
    }

    fn lookup_name_tree<'a>(
        &'a self,
        node: &'a Dictionary,
        name: &[u8],
        visited: &mut HashSet<ObjectId>,
    ) -> Option<&'a Object> {
        if let Some(pairs) = self.dict_entry(node, b"Names").and_then(|o| o.as_array().ok()) {
            for pair in pairs.chunks(2) {
                if let [key, value] = pair {
                    if self.resolve(key).and_then(|k| k.as_str().ok()) == Some(name) {
                        return Some(value);
                    }
                }
            }
        }
        let kids = self.dict_entry(node, b"Kids").and_then(|o| o.as_array().ok())?;
        for kid in kids {
            if let Object::Reference(id) = kid {
                if !visited.insert(*id) {
                    continue;
                }
            }
            if let Some(kid_dict) = self.resolve_dict(kid) {
                if let Some(found) = self.lookup_name_tree(kid_dict, name, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn link_kind(&self, annot: &Dictionary) -> Option<LinkKind> {
        if let Some(action) = self.dict_entry(annot, b"A").and_then(|o| o.as_dict().ok()) {
            let kind = action.get(b"S").ok().and_then(|o| o.as_name().ok());
            match kind {
                Some(b"URI") => {
                    let uri = self.dict_entry(action, b"URI")?.as_str().ok()?;
                    return Some(LinkKind::Uri(String::from_utf8_lossy(uri).to_string()));
                }
                Some(b"GoTo") => {
                    let page_index = self.resolve_destination(action.get(b"D").ok()?, 0)?;
                    return Some(LinkKind::GoTo { page_index });
                }
                _ => return None,
            }
        }
        let page_index = self.resolve_destination(annot.get(b"Dest").ok()?, 0)?;
        Some(LinkKind::GoTo { page_index })
    }
}

/// Bytes of a stream, decompressed when it carries a filter.
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    } else {
        stream.content.clone()
    }
}

/// Read a 4-number rectangle array, normalized.
pub(crate) fn rect_from_array(array: &[Object]) -> Option<Rect> {
    if array.len() < 4 {
        return None;
    }
    let mut v = [0.0f32; 4];
    for (slot, obj) in v.iter_mut().zip(array) {
        *slot = obj.as_float().ok()?;
    }
    Some(Rect::from(v).normalized())
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> Rect {
        self.inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| rect_from_array(a))
            .filter(|r| r.is_valid())
            // Letter
            .unwrap_or(Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    fn crop_box(&self, page: PageId) -> Option<Rect> {
        let media_box = self.page_box(page);
        self.inherited(page, b"CropBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| rect_from_array(a))
            .and_then(|crop| crop.intersection(&media_box))
            .filter(|crop| crop.is_valid() && *crop != media_box)
    }

    fn rotation(&self, page: PageId) -> Rotation {
        self.inherited(page, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .map(Rotation::from_page_rotate)
            .unwrap_or_default()
    }

    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>> {
        Ok(self
            .scope_font_dicts(scope)
            .iter()
            .map(|(name, (dict, location))| self.font_info(name, dict, *location))
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(c) => c,
            // A page without content is legal and simply blank
            Err(_) => return Ok(Vec::new()),
        };

        match self.resolve(contents) {
            Some(Object::Stream(s)) => Ok(stream_bytes(s)),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = self.resolve(obj) {
                        content.extend_from_slice(&stream_bytes(s));
                        content.push(b' ');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::Corrupted(format!(
                "invalid content stream on page object {} {}",
                page_id.0, page_id.1
            ))),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, font: &BackendFontInfo, bytes: &[u8]) -> String {
        let font_dict = match font.location {
            FontLocation::Object(id) => self.doc.get_dictionary(id).ok(),
            // Inline font dictionaries are rare; look them up again
            FontLocation::Inline(scope) => self
                .scope_font_dicts(scope)
                .get(&font.name)
                .map(|(dict, _)| *dict),
            FontLocation::Unknown => None,
        };
        if let Some(font_dict) = font_dict {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Option<FormXObject> {
        let xobjects = self
            .scope_resources(scope)
            .and_then(|r| self.dict_entry(r, b"XObject"))
            .and_then(|o| o.as_dict().ok())?;
        let id = xobjects.get(name).ok()?.as_reference().ok()?;
        let stream = self.form_stream(id)?;
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Form");
        if !is_form {
            return None;
        }

        let mut matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        if let Some(m) = self
            .dict_entry(&stream.dict, b"Matrix")
            .and_then(|o| o.as_array().ok())
            .filter(|m| m.len() == 6)
        {
            for (slot, obj) in matrix.iter_mut().zip(m) {
                *slot = obj.as_float().unwrap_or(*slot);
            }
        }

        Some(FormXObject {
            id,
            content: stream_bytes(stream),
            matrix,
            has_resources: stream.dict.has(b"Resources"),
        })
    }

    fn page_links(&self, page: PageId) -> Vec<RawLink> {
        let Some(annots) = self
            .doc
            .get_dictionary(page)
            .ok()
            .and_then(|d| self.dict_entry(d, b"Annots"))
            .and_then(|o| o.as_array().ok())
        else {
            return Vec::new();
        };

        let mut links = Vec::new();
        for annot in annots {
            let Some(annot) = self.resolve_dict(annot) else {
                continue;
            };
            let is_link = annot
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok())
                .is_some_and(|s| s == b"Link");
            if !is_link {
                continue;
            }
            let Some(rect) = self
                .dict_entry(annot, b"Rect")
                .and_then(|o| o.as_array().ok())
                .and_then(|a| rect_from_array(a))
            else {
                continue;
            };
            match self.link_kind(annot) {
                Some(kind) => links.push(RawLink { rect, kind }),
                None => log::debug!("Skipping link annotation with unresolvable target"),
            }
        }
        links
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}
