//! Page tree inspection helpers

use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};

/// US Letter, used when a page has no media box anywhere in its tree
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page tree nesting we follow before giving up on a Parent chain
const MAX_TREE_DEPTH: usize = 64;

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("No Root reference in trailer".to_string())),
    };

    let pages_id = match doc.get_dictionary(catalog_id)?.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("No Pages reference in catalog".to_string())),
    };

    match doc.get_dictionary(pages_id)?.get(b"Count") {
        Ok(Object::Integer(n)) => Ok((*n).max(0) as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    count_pages_from_catalog(&doc)
}

/// Resolve an object to a dictionary, following one reference
pub fn resolve_dictionary(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Look up a page attribute, walking up the Parent chain for inheritable keys
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;

        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return None,
        }
    }

    None
}

fn as_number(doc: &Document, object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(n) => Some(*n),
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| as_number(doc, o)),
        _ => None,
    }
}

/// Media box of a page as `[llx, lly, urx, ury]`
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let array = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(array)) => array,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(array)) => array.clone(),
            _ => return DEFAULT_MEDIA_BOX,
        },
        _ => return DEFAULT_MEDIA_BOX,
    };

    let numbers: Vec<f32> = array.iter().filter_map(|o| as_number(doc, o)).collect();

    match numbers.as_slice() {
        [llx, lly, urx, ury] => [*llx, *lly, *urx, *ury],
        _ => DEFAULT_MEDIA_BOX,
    }
}
