//! Stamping recipient text onto template pages
//!
//! The text is drawn once into a Form XObject sized to the first template
//! page. Every page of the template then gets its original content isolated
//! in a `q`/`Q` pair followed by an invocation of that XObject, so the stamp
//! sits on top of the page and is not affected by the page's own transforms.

use std::path::Path;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use log::debug;

use crate::error::{Error, Result};
use crate::layout::TextItem;
use crate::pdf::inspect::{inherited_attribute, media_box, resolve_dictionary};

/// Resource name the overlay is registered under on each page
const STAMP_XOBJECT: &str = "SerienbriefStamp";

/// Load a template and stamp the text items onto every page
///
/// # Example
///
/// ```no_run
/// use serienbrief::layout::TextItem;
/// use serienbrief::pdf::annotate_document;
/// use std::path::Path;
///
/// let items = vec![TextItem::new("Anna", 50.0, 795.0, 16.0).bold()];
/// let mut doc = annotate_document(Path::new("brief_1.pdf"), &items)
///     .expect("Failed to stamp template");
/// doc.save("anna.pdf").expect("Failed to save");
/// ```
pub fn annotate_document(template: &Path, items: &[TextItem]) -> Result<Document> {
    if !template.exists() {
        return Err(Error::TemplateNotFound(template.to_path_buf()));
    }

    let mut doc = Document::load(template)?;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let first_page = *page_ids
        .first()
        .ok_or_else(|| Error::EmptyPdf(template.to_path_buf()))?;

    let bbox = media_box(&doc, first_page);
    let overlay_id = create_overlay(&mut doc, items, bbox)?;

    // Shared by all pages: open a graphics state before the page content,
    // close it after, then draw the stamp
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("Q\nq\n/{} Do\nQ\n", STAMP_XOBJECT).into_bytes(),
    ));

    for page_id in &page_ids {
        add_xobject_to_page_resources(&mut doc, *page_id, overlay_id)?;
        prepend_content_to_page(&mut doc, *page_id, open_id)?;
        append_content_to_page(&mut doc, *page_id, stamp_id)?;
    }

    debug!(
        "Stamped {} text item(s) onto {} page(s) of {}",
        items.len(),
        page_ids.len(),
        template.display()
    );

    Ok(doc)
}

/// Stamp a template and return the saved PDF bytes
pub fn annotate(template: &Path, items: &[TextItem]) -> Result<Vec<u8>> {
    let mut doc = annotate_document(template, items)?;
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Standard Type1 font dictionary (no embedding needed)
fn standard_font(base_font: &str) -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

/// Content stream drawing the text items
fn overlay_content(items: &[TextItem]) -> Result<Vec<u8>> {
    let mut operations = vec![Operation::new("g", vec![Object::Integer(0)])];

    for item in items {
        let font = if item.bold { "F2" } else { "F1" };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.as_bytes().to_vec()), Object::Real(item.font_size)],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(item.x),
                    Object::Real(item.y),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&item.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    Ok(Content { operations }.encode()?)
}

/// Create the Form XObject holding the stamp
fn create_overlay(doc: &mut Document, items: &[TextItem], bbox: [f32; 4]) -> Result<ObjectId> {
    let regular_id = doc.add_object(standard_font("Helvetica"));
    let bold_id = doc.add_object(standard_font("Helvetica-Bold"));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(regular_id));
    fonts.set("F2", Object::Reference(bold_id));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(bbox.iter().map(|v| Object::Real(*v)).collect()),
    );
    xobject_dict.set(
        "Matrix",
        Object::Array(vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
        ]),
    );
    xobject_dict.set("Resources", Object::Dictionary(resources));

    let stream = Stream::new(xobject_dict, overlay_content(items)?);
    Ok(doc.add_object(stream))
}

/// Encode text for WinAnsiEncoding
///
/// Latin-1 maps one to one; the typographic characters WinAnsi keeps in
/// 0x80..0x9F are translated, anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Register the overlay in the page's own Resources
///
/// Inherited resources are copied onto the page first so the page keeps
/// everything it could see before.
fn add_xobject_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<()> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| resolve_dictionary(doc, &res))
        .unwrap_or_default();

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|xo| resolve_dictionary(doc, xo))
        .unwrap_or_default();

    xobjects.set(STAMP_XOBJECT, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Current Contents of a page as a list of objects
fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;

    let contents = match page.get(b"Contents") {
        Ok(Object::Array(array)) => array.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(array)) => array.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(other) => vec![other.clone()],
        Err(_) => vec![],
    };

    Ok(contents)
}

/// Put a content stream in front of the page's Contents
fn prepend_content_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.insert(0, Object::Reference(content_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));

    Ok(())
}

/// Add a content stream after the page's Contents
fn append_content_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.push(Object::Reference(content_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Anna"), b"Anna".to_vec());
        assert_eq!(encode_win_ansi("Jürg"), vec![b'J', 0xFC, b'r', b'g']);
        assert_eq!(encode_win_ansi("\u{20AC}5"), vec![0x80, b'5']);
        assert_eq!(encode_win_ansi("\u{4E2D}"), vec![b'?']);
    }

    #[test]
    fn test_overlay_content_selects_font() {
        let items = vec![
            TextItem::new("Anna", 50.0, 795.0, 16.0).bold(),
            TextItem::new("(Pfadi)", 50.0, 778.0, 12.0),
        ];
        let content = Content::decode(&overlay_content(&items).unwrap()).unwrap();

        let fonts: Vec<&Object> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tf")
            .map(|op| &op.operands[0])
            .collect();
        assert_eq!(
            fonts,
            vec![&Object::Name(b"F2".to_vec()), &Object::Name(b"F1".to_vec())]
        );

        let shown = content.operations.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!(shown, 2);
    }

    #[test]
    fn test_annotate_missing_template() {
        let result = annotate(Path::new("nonexistent.pdf"), &[]);
        assert!(matches!(result.unwrap_err(), Error::TemplateNotFound(_)));
    }

    #[test]
    fn test_prepend_and_append_wrap_existing_content() {
        let mut doc = Document::with_version("1.5");
        let original = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Contents", Object::Reference(original)),
        ]));
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), b"Q".to_vec()));

        prepend_content_to_page(&mut doc, page_id, open).unwrap();
        append_content_to_page(&mut doc, page_id, close).unwrap();

        let contents = page_contents(&doc, page_id).unwrap();
        assert_eq!(
            contents,
            vec![
                Object::Reference(open),
                Object::Reference(original),
                Object::Reference(close),
            ]
        );
    }
}
