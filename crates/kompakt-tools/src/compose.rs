// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-to-PDF assembly: one page per input image, scaled to fit inside
// the page margins.
//
// printpdf 0.8 is data-oriented: pages are `PdfPage` structs holding
// `Vec<Op>` operation lists, serialised via `PdfDocument::save()`.

use kompakt_core::error::{KompaktError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Output page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A4,
    Letter,
}

impl PaperSize {
    /// Page dimensions in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
        }
    }
}

/// Assembles raster images into a PDF, one page per image.
pub struct PdfComposer {
    paper_size: PaperSize,
    margin_mm: f32,
    title: String,
}

impl PdfComposer {
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            margin_mm: 15.0,
            title: "Kompakt Document".into(),
        }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Build a PDF with one page per image, in input order.
    ///
    /// Every input must decode; a bad image fails the whole call since a
    /// document with silently missing pages is worse than no document.
    #[instrument(skip(self, images), fields(images = images.len(), paper = ?self.paper_size))]
    pub fn compose(&self, images: &[&[u8]]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(KompaktError::PdfError("no images to compose".into()));
        }

        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        let (page_w, page_h) = (Mm(w_mm), Mm(h_mm));

        let mut doc = PdfDocument::new(&self.title);
        let mut pages: Vec<PdfPage> = Vec::new();

        for (index, bytes) in images.iter().enumerate() {
            let decoded = image::load_from_memory(bytes).map_err(|err| {
                KompaktError::ImageError(format!("image #{} failed to decode: {}", index + 1, err))
            })?;
            let rgb = decoded.to_rgb8();
            let (img_w, img_h) = (rgb.width() as usize, rgb.height() as usize);
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: img_w,
                height: img_h,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: self.fit_transform(img_w, img_h, page_w, page_h),
            }];
            pages.push(PdfPage::new(page_w, page_h, ops));
            debug!(index, img_w, img_h, "image placed");
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        info!(pages = images.len(), output_bytes = output.len(), "pdf composed");
        Ok(output)
    }

    /// Centre the image inside the page margins, scaled to fit without
    /// upscaling, at a nominal 150 DPI.
    fn fit_transform(
        &self,
        img_w: usize,
        img_h: usize,
        page_w: Mm,
        page_h: Mm,
    ) -> XObjectTransform {
        let dpi: f32 = 150.0;
        let usable_w_pt = Mm(page_w.0 - 2.0 * self.margin_mm).into_pt().0;
        let usable_h_pt = Mm(page_h.0 - 2.0 * self.margin_mm).into_pt().0;

        let img_w_pt = img_w as f32 / dpi * 72.0;
        let img_h_pt = img_h as f32 / dpi * 72.0;
        let scale = (usable_w_pt / img_w_pt).min(usable_h_pt / img_h_pt).min(1.0);

        let margin_pt = Mm(self.margin_mm).into_pt().0;
        let x_offset = margin_pt + (usable_w_pt - img_w_pt * scale) / 2.0;
        let y_offset = margin_pt + (usable_h_pt - img_h_pt * scale) / 2.0;

        XObjectTransform {
            translate_x: Some(Pt(x_offset)),
            translate_y: Some(Pt(y_offset)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(dpi),
            rotate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_ops::PdfToolkit;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([90, 140, 200, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn one_page_per_image() {
        let first = png(300, 200);
        let second = png(120, 400);
        let third = png(64, 64);
        let pdf = PdfComposer::a4()
            .compose(&[&first, &second, &third])
            .unwrap();
        assert_eq!(PdfToolkit::page_count(&pdf).unwrap(), 3);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(PdfComposer::a4().compose(&[]).is_err());
    }

    #[test]
    fn undecodable_image_fails_the_whole_call() {
        let good = png(64, 64);
        let bad = b"not an image".to_vec();
        assert!(PdfComposer::a4().compose(&[&good, &bad]).is_err());
    }

    #[test]
    fn letter_paper_is_accepted() {
        let img = png(100, 100);
        let pdf = PdfComposer::new(PaperSize::Letter).compose(&[&img]).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
