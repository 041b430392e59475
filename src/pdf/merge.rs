// Stamps overlays onto template pages. Each output page draws the template
// page as a form XObject and then the overlay form over it.
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{CertError, Result};

use super::fonts::FontSet;
use super::overlay::{OverlayPage, PageSize, FONT_BOLD, FONT_REGULAR};

/// Only the first two template pages carry certificate content.
pub const MAX_TEMPLATE_PAGES: usize = 2;

// Page attributes that may be inherited from the page tree.
const INHERIT_DEPTH: usize = 32;

/// A template parsed once per batch and cloned for every certificate.
#[derive(Debug, Clone)]
pub struct TemplatePdf {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl TemplatePdf {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(CertError::Render("template has no pages".into()));
        }
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of pages every merged certificate will have.
    pub fn output_pages(&self) -> usize {
        self.pages.len().min(MAX_TEMPLATE_PAGES)
    }

    pub fn media_box(&self, index: usize) -> Result<[f32; 4]> {
        let page_id = *self
            .pages
            .get(index)
            .ok_or_else(|| CertError::Render(format!("template has no page {}", index + 1)))?;
        let obj = inherited(&self.doc, page_id, b"MediaBox").ok_or_else(|| {
            CertError::Render(format!("template page {} has no MediaBox", index + 1))
        })?;
        rect(&self.doc, &obj)
            .ok_or_else(|| CertError::Render(format!("template page {} MediaBox is malformed", index + 1)))
    }

    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        let [x0, y0, x1, y1] = self.media_box(index)?;
        Ok(PageSize {
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        })
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look `key` up on the page, then on its ancestors.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(arr) {
        *slot = number(resolve(doc, value))?;
    }
    let [x0, y0, x1, y1] = out;
    Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
}

fn rect_object(r: [f32; 4]) -> Object {
    Object::Array(r.iter().map(|&v| v.into()).collect())
}

fn add_fonts(doc: &mut Document, fonts: &FontSet) -> Dictionary {
    let mut font_dict = Dictionary::new();
    for (name, face) in [(FONT_REGULAR, &fonts.regular), (FONT_BOLD, &fonts.bold)] {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        font_dict.set(name, id);
    }
    font_dict
}

/// The page's content streams decoded and joined. A page may split its
/// content across streams at any token boundary, so each part is followed by
/// a newline to keep the last operator of one part apart from the next.
fn page_content(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };
        match stream.decompressed_content() {
            Ok(data) => content.extend_from_slice(&data),
            Err(_) => content.extend_from_slice(&stream.content),
        }
        content.push(b'\n');
    }
    content
}

fn template_form(doc: &mut Document, page_id: ObjectId, bbox: [f32; 4]) -> ObjectId {
    let content = page_content(doc, page_id);
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect_object(bbox),
    };
    if let Some(resources) = inherited(doc, page_id, b"Resources") {
        dict.set("Resources", resources);
    }
    doc.add_object(Stream::new(dict, content))
}

fn overlay_form(
    doc: &mut Document,
    overlay: &OverlayPage,
    bbox: [f32; 4],
    fonts: &Dictionary,
) -> Result<ObjectId> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect_object(bbox),
        // overlay coordinates start at the box corner
        "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), bbox[0].into(), bbox[1].into()],
        "Resources" => dictionary! { "Font" => fonts.clone() },
    };
    Ok(doc.add_object(Stream::new(dict, overlay.encode()?)))
}

/// Merge one overlay onto each of the first (up to two) template pages and
/// return the finished PDF. Overlays beyond the template's page count are
/// ignored.
pub fn merge_overlays(
    template: &TemplatePdf,
    overlays: &[OverlayPage],
    fonts: &FontSet,
) -> Result<Vec<u8>> {
    let mut doc = template.doc.clone();
    let pages_id = doc.new_object_id();
    let font_dict = add_fonts(&mut doc, fonts);
    let mut kids = Vec::new();

    for (index, overlay) in overlays.iter().enumerate().take(template.output_pages()) {
        let page_id = template.pages[index];
        let bbox = template.media_box(index)?;

        let tpl = template_form(&mut doc, page_id, bbox);
        let ovl = overlay_form(&mut doc, overlay, bbox, &font_dict)?;
        let contents = doc.add_object(Stream::new(
            Dictionary::new(),
            b"q /Tpl Do Q\nq /Ovl Do Q\n".to_vec(),
        ));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect_object(bbox),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Tpl" => tpl, "Ovl" => ovl },
            },
            "Contents" => contents,
        });
        kids.push(Object::Reference(page));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);
    doc.trailer.remove(b"Encrypt");
    doc.prune_objects();
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{blank_template, page_forms, split_template, text_items};
    use crate::pdf::overlay::{render_statement_page, PageSize};
    use crate::compose::RichText;

    fn overlay(label: &str, size: PageSize) -> OverlayPage {
        let mut text = RichText::default();
        text.push(label, false);
        render_statement_page(size, &text, "City, 01/04/2024", &FontSet::HELVETICA)
    }

    fn merge(pages: usize) -> Document {
        let template = TemplatePdf::parse(&blank_template(pages)).unwrap();
        let size = template.page_size(0).unwrap();
        let overlays = [overlay("front", size), overlay("back", size)];
        let bytes = merge_overlays(&template, &overlays, &FontSet::HELVETICA).unwrap();
        Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn page_count_follows_template() {
        assert_eq!(merge(1).get_pages().len(), 1);
        assert_eq!(merge(2).get_pages().len(), 2);
        assert_eq!(merge(3).get_pages().len(), 2);
    }

    #[test]
    fn page_size_is_read_from_template() {
        let template = TemplatePdf::parse(&blank_template(2)).unwrap();
        assert_eq!(template.page_count(), 2);
        let size = template.page_size(1).unwrap();
        assert!((size.width - 841.89).abs() < 0.01);
        assert!((size.height - 595.27).abs() < 0.01);
        assert!(template.page_size(2).is_err());
    }

    #[test]
    fn overlay_draws_after_template() {
        let doc = merge(2);
        for (i, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
            let content = doc.get_page_content(page_id).unwrap();
            let content = String::from_utf8_lossy(&content);
            let tpl = content.find("/Tpl Do").unwrap();
            let ovl = content.find("/Ovl Do").unwrap();
            assert!(tpl < ovl);

            let (template_ops, overlay_ops) = page_forms(&doc, page_id);
            let template_text: Vec<_> = text_items(&template_ops).into_iter().map(|t| t.text).collect();
            assert_eq!(template_text, vec![format!("Template page {}", i + 1)]);
            let overlay_text: Vec<_> = text_items(&overlay_ops).into_iter().map(|t| t.text).collect();
            assert_eq!(overlay_text[0], if i == 0 { "front" } else { "back" });
        }
    }

    #[test]
    fn split_template_content_keeps_operators_apart() {
        let template = TemplatePdf::parse(&split_template(&[
            "q 1 0 0 1 0 0 cm",
            "BT /T1 24 Tf 72 500 Td (Template) Tj ET Q",
        ]))
        .unwrap();
        let size = template.page_size(0).unwrap();
        let bytes = merge_overlays(&template, &[overlay("front", size)], &FontSet::HELVETICA).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();

        let (template_ops, _) = page_forms(&doc, page_id);
        let ops: Vec<_> = template_ops.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(ops, vec!["q", "cm", "BT", "Tf", "Td", "Tj", "ET", "Q"]);
        let text: Vec<_> = text_items(&template_ops).into_iter().map(|t| t.text).collect();
        assert_eq!(text, vec!["Template"]);
    }

    #[test]
    fn merged_page_keeps_template_box() {
        let doc = merge(1);
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let mb = rect(&doc, page.get(b"MediaBox").unwrap()).unwrap();
        assert_eq!(mb[0], 0.0);
        assert!((mb[2] - 841.89).abs() < 0.01);
        assert!((mb[3] - 595.27).abs() < 0.01);
    }

    #[test]
    fn corrupt_template_is_rejected() {
        assert!(matches!(TemplatePdf::parse(b"%PDF-1.4 garbage"), Err(CertError::Pdf(_))));
    }
}
