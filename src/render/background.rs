//! Page backgrounds: embedded rasters and imported source pages.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::parser::backend::rect_from_array;
use crate::model::Rect;

/// Maximum `/Parent` hops when looking up inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// Embed an RGB raster as a Flate-compressed image XObject.
pub fn raster_xobject(doc: &mut Document, image: &RgbImage) -> Result<ObjectId> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image.as_raw())?;
    let data = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width()),
        "Height" => i64::from(image.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    let mut stream = Stream::new(dict, data);
    stream.allows_compression = false;
    Ok(doc.add_object(stream))
}

/// Copies pages of a source document into the output as form XObjects.
///
/// Objects shared between pages (fonts, images) are copied once.
pub struct SourceImporter<'s> {
    source: &'s Document,
    pages: Vec<ObjectId>,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'s> SourceImporter<'s> {
    pub fn new(source: &'s Document) -> Self {
        Self {
            source,
            pages: source.get_pages().into_values().collect(),
            copied: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Import page `page_index` (0-based) as a form XObject whose origin is
    /// the lower-left corner of its media box.
    pub fn import_page(&mut self, target: &mut Document, page_index: usize) -> Result<ObjectId> {
        let page_id = *self
            .pages
            .get(page_index)
            .ok_or(Error::PageOutOfRange(page_index, self.pages.len()))?;

        let content = self.source.get_page_content(page_id)?;
        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| self.resolve(obj).as_array().ok())
            .and_then(|arr| rect_from_array(arr))
            .unwrap_or(Rect::new(0.0, 0.0, 612.0, 792.0));

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => vec![
                Object::Real(media_box.x0),
                Object::Real(media_box.y0),
                Object::Real(media_box.x1),
                Object::Real(media_box.y1),
            ],
            "Matrix" => vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(-media_box.x0),
                Object::Real(-media_box.y0),
            ],
        };
        if let Some(resources) = self.inherited(page_id, b"Resources").cloned() {
            dict.set("Resources", self.copy(target, &resources));
        }

        Ok(target.add_object(Stream::new(dict, content)))
    }

    fn resolve<'o>(&'o self, obj: &'o Object) -> &'o Object {
        match obj {
            Object::Reference(id) => self.source.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// Page attribute, following `/Parent` for inheritable keys.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&'s Object> {
        let mut dict = self.source.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERIT_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.source.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Deep-copy `obj` into `target`, remapping references. `/Parent` links
    /// are dropped so no page tree is pulled in.
    fn copy(&mut self, target: &mut Document, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => {
                if let Some(&new_id) = self.copied.get(id) {
                    return Object::Reference(new_id);
                }
                let new_id = target.new_object_id();
                self.copied.insert(*id, new_id);
                let copied = match self.source.get_object(*id) {
                    Ok(inner) => self.copy(target, inner),
                    Err(_) => {
                        log::debug!("Dangling reference {:?} in source page", id);
                        Object::Null
                    }
                };
                target.objects.insert(new_id, copied);
                Object::Reference(new_id)
            }
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy(target, item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(target, dict)),
            Object::Stream(stream) => {
                let dict = self.copy_dict(target, &stream.dict);
                let mut copied = Stream::new(dict, stream.content.clone());
                copied.allows_compression = stream.allows_compression;
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn copy_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy(target, value));
        }
        copied
    }
}
