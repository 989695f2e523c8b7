//! Link annotations and named page destinations.

use lopdf::{dictionary, Dictionary, Object, ObjectId};

use super::plan::{LinkOp, LinkTarget};
use crate::model::Rect;

fn rect_array(rect: &Rect) -> Vec<Object> {
    vec![
        Object::Real(rect.x0),
        Object::Real(rect.y0),
        Object::Real(rect.x1),
        Object::Real(rect.y1),
    ]
}

/// `/Annot` dictionary for a planned link, borderless.
pub fn link_annotation(link: &LinkOp) -> Dictionary {
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect_array(&link.rect),
        "Border" => vec![0.into(), 0.into(), 0.into()],
    };
    match &link.target {
        LinkTarget::Uri(uri) => {
            annot.set(
                "A",
                dictionary! {
                    "Type" => "Action",
                    "S" => "URI",
                    "URI" => Object::string_literal(uri.as_str()),
                },
            );
        }
        LinkTarget::Named(name) => {
            annot.set("Dest", Object::Name(name.as_bytes().to_vec()));
        }
    }
    annot
}

/// Catalog `/Dests` entry: fit the whole page.
pub fn page_destination(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), "Fit".into()])
}
