// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF merge and split by direct page-object copying. Vector content is
// never rasterised; pages move between documents with their resources
// deep-cloned.

use kompakt_core::error::{KompaktError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

/// Page-level PDF operations over in-memory documents.
pub struct PdfToolkit;

/// One skipped merge input.
#[derive(Debug, Clone)]
pub struct MergeSkip {
    /// Zero-based index of the input in the merge call.
    pub index: usize,
    pub reason: String,
}

/// Result of a merge: combined bytes plus per-file skip report.
#[derive(Debug)]
pub struct MergeOutcome {
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub skipped: Vec<MergeSkip>,
}

impl PdfToolkit {
    /// Merge documents in input order into one PDF.
    ///
    /// An input that fails to parse is skipped and reported rather than
    /// failing the whole merge; the call errors only when not a single
    /// input yields a page.
    #[instrument(skip(sources), fields(inputs = sources.len()))]
    pub fn merge(sources: &[&[u8]]) -> Result<MergeOutcome> {
        let mut merged = blank_document();
        let mut skipped = Vec::new();
        let mut pages = 0usize;

        for (index, bytes) in sources.iter().enumerate() {
            let doc = match Document::load_mem(bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(index, %err, "merge input skipped");
                    skipped.push(MergeSkip { index, reason: err.to_string() });
                    continue;
                }
            };

            let source_pages = doc.get_pages();
            let mut numbers: Vec<u32> = source_pages.keys().copied().collect();
            numbers.sort_unstable();
            for number in numbers {
                copy_page(&doc, &mut merged, source_pages[&number])?;
                pages += 1;
            }
        }

        if pages == 0 {
            return Err(KompaktError::PdfError(
                "no merge input contained a readable page".into(),
            ));
        }

        let bytes = serialize(&mut merged)?;
        info!(pages, skipped = skipped.len(), "merge complete");
        Ok(MergeOutcome { bytes, pages, skipped })
    }

    /// Number of pages in a document.
    pub fn page_count(bytes: &[u8]) -> Result<usize> {
        let doc = Document::load_mem(bytes)
            .map_err(|err| KompaktError::PdfError(format!("load failed: {}", err)))?;
        Ok(doc.get_pages().len())
    }

    /// Split after `after_page` (1-indexed, inclusive) into two documents.
    #[instrument(skip(bytes), fields(after_page))]
    pub fn split_at(bytes: &[u8], after_page: u32) -> Result<(Vec<u8>, Vec<u8>)> {
        let doc = Document::load_mem(bytes)
            .map_err(|err| KompaktError::PdfError(format!("load failed: {}", err)))?;
        let total = doc.get_pages().len() as u32;
        if after_page == 0 || after_page >= total {
            return Err(KompaktError::PdfError(format!(
                "split point {} invalid for a {} page document",
                after_page, total
            )));
        }

        let first = extract_range(&doc, 1, after_page)?;
        let second = extract_range(&doc, after_page + 1, total)?;
        info!(after_page, total, "split complete");
        Ok((first, second))
    }

    /// Extract pages `start..=end` (1-indexed) into a new document.
    #[instrument(skip(bytes), fields(start, end))]
    pub fn extract_pages(bytes: &[u8], start: u32, end: u32) -> Result<Vec<u8>> {
        let doc = Document::load_mem(bytes)
            .map_err(|err| KompaktError::PdfError(format!("load failed: {}", err)))?;
        let total = doc.get_pages().len() as u32;
        if start == 0 || start > end || end > total {
            return Err(KompaktError::PdfError(format!(
                "page range {}..={} invalid for a {} page document",
                start, end, total
            )));
        }
        extract_range(&doc, start, end)
    }
}

/// A fresh document with an empty page tree, ready to receive copied pages.
fn blank_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(Vec::new()),
            "Count" => 0,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| KompaktError::PdfError(format!("save failed: {}", err)))?;
    Ok(bytes)
}

fn extract_range(doc: &Document, start: u32, end: u32) -> Result<Vec<u8>> {
    let pages = doc.get_pages();
    let mut out = blank_document();
    for number in start..=end {
        let page_id = *pages.get(&number).ok_or_else(|| {
            KompaktError::PdfError(format!("page {} missing from the page tree", number))
        })?;
        copy_page(doc, &mut out, page_id)?;
    }
    debug!(start, end, "range extracted");
    serialize(&mut out)
}

/// Copy one page and everything it references into `target`, appending it
/// to the target's page tree.
fn copy_page(source: &Document, target: &mut Document, page_id: ObjectId) -> Result<()> {
    let page = source
        .get_object(page_id)
        .map_err(|err| KompaktError::PdfError(format!("unreadable page {:?}: {}", page_id, err)))?;

    let copied = copy_object(source, target, page)?;
    let copied_id = target.add_object(copied);

    let pages_id = page_tree_root(target)?;
    if let Ok(Object::Dictionary(pages)) = target.get_object_mut(pages_id) {
        if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
            kids.push(Object::Reference(copied_id));
        }
        if let Ok(Object::Integer(count)) = pages.get_mut(b"Count") {
            *count += 1;
        }
    }
    if let Ok(Object::Dictionary(page)) = target.get_object_mut(copied_id) {
        page.set("Parent", Object::Reference(pages_id));
    }
    Ok(())
}

/// The target document's /Pages node.
fn page_tree_root(doc: &Document) -> Result<ObjectId> {
    let catalog = doc
        .catalog()
        .map_err(|err| KompaktError::PdfError(format!("no catalog: {}", err)))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(KompaktError::PdfError("/Pages is not a reference".into())),
    }
}

/// Deep-copy an object graph between documents. References are resolved in
/// the source and re-created in the target; /Parent is skipped (the caller
/// re-points it) so the page tree back-edge cannot recurse.
fn copy_object(source: &Document, target: &mut Document, object: &Object) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => {
            Ok(Object::Dictionary(copy_dictionary(source, target, dict)?))
        }
        Object::Array(items) => {
            let mut copied = Vec::with_capacity(items.len());
            for item in items {
                copied.push(copy_object(source, target, item)?);
            }
            Ok(Object::Array(copied))
        }
        Object::Reference(id) => match source.get_object(*id) {
            Ok(referenced) => {
                let copied = copy_object(source, target, referenced)?;
                let new_id = target.add_object(copied);
                Ok(Object::Reference(new_id))
            }
            Err(err) => {
                warn!(?id, %err, "dangling reference replaced with null");
                Ok(Object::Null)
            }
        },
        Object::Stream(stream) => {
            let dict = copy_dictionary(source, target, &stream.dict)?;
            Ok(Object::Stream(lopdf::Stream::new(dict, stream.content.clone())))
        }
        other => Ok(other.clone()),
    }
}

fn copy_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
) -> Result<Dictionary> {
    let mut copied = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        copied.set(key.clone(), copy_object(source, target, value)?);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal n-page text PDF built directly with lopdf.
    fn pdf_with_pages(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for index in 0..count {
            let text = format!("BT /F1 24 Tf 72 720 Td (page {}) Tj ET", index + 1);
            let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(
                dictionary! {},
                text.into_bytes(),
            )));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn merge_adds_page_counts() {
        let a = pdf_with_pages(2);
        let b = pdf_with_pages(3);
        let outcome = PdfToolkit::merge(&[&a, &b]).unwrap();
        assert_eq!(outcome.pages, 5);
        assert!(outcome.skipped.is_empty());
        assert_eq!(PdfToolkit::page_count(&outcome.bytes).unwrap(), 5);
    }

    #[test]
    fn merge_skips_unparseable_inputs_and_reports_them() {
        let good = pdf_with_pages(2);
        let bad = b"this is not a pdf".to_vec();
        let outcome = PdfToolkit::merge(&[&good, &bad]).unwrap();
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].index, 1);
    }

    #[test]
    fn merge_with_no_usable_input_is_an_error() {
        let bad = b"junk".to_vec();
        assert!(PdfToolkit::merge(&[&bad]).is_err());
    }

    #[test]
    fn split_partitions_every_page() {
        let input = pdf_with_pages(5);
        let (first, second) = PdfToolkit::split_at(&input, 2).unwrap();
        assert_eq!(PdfToolkit::page_count(&first).unwrap(), 2);
        assert_eq!(PdfToolkit::page_count(&second).unwrap(), 3);
    }

    #[test]
    fn split_rejects_out_of_range_points() {
        let input = pdf_with_pages(3);
        assert!(PdfToolkit::split_at(&input, 0).is_err());
        assert!(PdfToolkit::split_at(&input, 3).is_err());
        assert!(PdfToolkit::split_at(&input, 7).is_err());
    }

    #[test]
    fn extract_pages_takes_an_inclusive_range() {
        let input = pdf_with_pages(4);
        let middle = PdfToolkit::extract_pages(&input, 2, 3).unwrap();
        assert_eq!(PdfToolkit::page_count(&middle).unwrap(), 2);
        assert!(PdfToolkit::extract_pages(&input, 3, 2).is_err());
        assert!(PdfToolkit::extract_pages(&input, 1, 9).is_err());
    }
}
