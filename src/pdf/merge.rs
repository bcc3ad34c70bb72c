//! Merge accumulator with duplex padding
//!
//! Pages are collected from any number of documents into one growing page
//! list. After an append the caller asks for [`MergeAccumulator::pad_to_even`],
//! which adds one page from a blank filler PDF when the running count is odd,
//! so every document stack starts on a fresh sheet when printed double-sided.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId};
use log::{debug, warn};

use crate::error::Result;
use crate::pdf::inspect::inherited_attribute;

/// Page attributes that may live on a parent Pages node
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// What [`MergeAccumulator::pad_to_even`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadOutcome {
    /// Count was already even, nothing appended
    AlreadyEven,
    /// One filler page was appended
    Padded,
    /// Count is odd but the filler file does not exist
    FillerMissing,
}

/// Ordered collection of pages being merged into one output document
///
/// # Example
///
/// ```no_run
/// use serienbrief::pdf::MergeAccumulator;
/// use std::path::Path;
///
/// let mut merged = MergeAccumulator::new("empty.pdf");
/// merged.append(Path::new("brief_1.pdf")).expect("Failed to append");
/// merged.pad_to_even().expect("Failed to pad");
/// merged.flush(Path::new("out.pdf")).expect("Failed to write");
/// ```
#[derive(Debug)]
pub struct MergeAccumulator {
    filler_path: PathBuf,
    objects: BTreeMap<ObjectId, Object>,
    page_ids: Vec<ObjectId>,
    /// Next free object number
    next_id: u32,
}

impl MergeAccumulator {
    /// Empty accumulator padding with pages from `filler_path`
    pub fn new(filler_path: impl Into<PathBuf>) -> Self {
        Self {
            filler_path: filler_path.into(),
            objects: BTreeMap::new(),
            page_ids: Vec::new(),
            next_id: 1,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Append all pages of a PDF file
    pub fn append(&mut self, path: &Path) -> Result<usize> {
        let doc = Document::load(path)?;
        Ok(self.append_document(doc))
    }

    /// Append all pages of an in-memory document, returning how many were added
    pub fn append_document(&mut self, mut doc: Document) -> usize {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        // The source page tree is dropped below, so anything a page inherits
        // from it has to move onto the page itself
        for &page_id in &pages {
            flatten_inherited_attributes(&mut doc, page_id);
        }

        for (id, object) in doc.objects {
            if is_tree_node(&object) {
                continue;
            }
            self.objects.insert(id, object);
        }

        self.page_ids.extend(&pages);
        pages.len()
    }

    /// Append one filler page if the page count is odd
    pub fn pad_to_even(&mut self) -> Result<PadOutcome> {
        if self.page_count() % 2 == 0 {
            return Ok(PadOutcome::AlreadyEven);
        }

        if !self.filler_path.exists() {
            warn!(
                "Blank filler '{}' not found. Cannot add blank page.",
                self.filler_path.display()
            );
            return Ok(PadOutcome::FillerMissing);
        }

        let mut filler = Document::load(&self.filler_path)?;
        let page_count = filler.get_pages().len() as u32;
        if page_count == 0 {
            warn!(
                "Blank filler '{}' has no pages. Cannot add blank page.",
                self.filler_path.display()
            );
            return Ok(PadOutcome::FillerMissing);
        }
        if page_count > 1 {
            let extra: Vec<u32> = (2..=page_count).collect();
            filler.delete_pages(&extra);
            filler.prune_objects();
        }

        self.append_document(filler);
        debug!("Padded with a blank page, now {} pages", self.page_count());

        Ok(PadOutcome::Padded)
    }

    /// Discard all collected pages
    pub fn reset(&mut self) {
        self.objects.clear();
        self.page_ids.clear();
        self.next_id = 1;
    }

    /// Build the merged document without consuming the accumulator
    pub fn to_document(&self) -> Document {
        build_document(self.objects.clone(), &self.page_ids, self.next_id)
    }

    /// Write the merged document to `path` and reset, returning the pages written
    pub fn flush(&mut self, path: &Path) -> Result<usize> {
        let objects = std::mem::take(&mut self.objects);
        let page_ids = std::mem::take(&mut self.page_ids);
        let next_id = self.next_id;
        self.reset();

        let mut doc = build_document(objects, &page_ids, next_id);
        doc.compress();
        doc.save(path)?;

        Ok(page_ids.len())
    }
}

/// Catalog or Pages node of a source page tree
fn is_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name == b"Catalog" || name == b"Pages"
        ),
        _ => false,
    }
}

/// Copy inherited attributes onto the page dictionary
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter_map(|key| {
            let page = doc.get_dictionary(page_id).ok()?;
            if page.has(key) {
                return None;
            }
            inherited_attribute(doc, page_id, key).map(|value| (*key, value))
        })
        .collect();

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

/// Assemble a document with a single flat page tree over `page_ids`
fn build_document(
    objects: BTreeMap<ObjectId, Object>,
    page_ids: &[ObjectId],
    next_id: u32,
) -> Document {
    let mut doc = Document::with_version("1.5");

    doc.objects.extend(objects);

    // new_object_id() must hand out ids past everything we just added
    doc.max_id = next_id - 1;

    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let catalog_id = doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    doc.objects.insert(pages_id, Object::Dictionary(pages));
    doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in page_ids {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    doc
}
