// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compression by re-encoding embedded image XObjects.
//
// Text and vector content pass through untouched; the byte savings come
// from downscaling raster XObjects and re-encoding them as JPEG at the
// preset's quality. When a preset fails to shrink the file the next more
// aggressive preset is tried, and a file that resists even `Low` comes
// back unchanged.

use std::io::Read;

use flate2::read::ZlibDecoder;
use image::DynamicImage;
use kompakt_core::error::{KompaktError, Result};
use kompakt_core::types::{AssetKind, CompressionResult, QualityPreset};
use kompakt_raster::raster::check_dimensions;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

pub struct PdfCompressor;

impl PdfCompressor {
    /// Compress a PDF towards the preset's target, escalating through more
    /// aggressive presets when the output refuses to shrink.
    ///
    /// Infallible by contract: unparseable input and incompressible files
    /// both return the original bytes with keep ratio 1.0. Page count is
    /// always preserved because only image streams are rewritten.
    #[instrument(skip(bytes), fields(input_len = bytes.len(), ?preset))]
    pub fn compress(bytes: &[u8], preset: QualityPreset) -> CompressionResult {
        let mut rung = Some(preset);
        while let Some(current) = rung {
            match Self::recompress(bytes, current) {
                Ok(output) if output.len() < bytes.len() => {
                    info!(
                        ?current,
                        out_len = output.len(),
                        "pdf compressed"
                    );
                    return CompressionResult::new(output, bytes.len() as u64, AssetKind::Pdf);
                }
                Ok(output) => {
                    debug!(
                        ?current,
                        out_len = output.len(),
                        "preset did not shrink the file, escalating"
                    );
                    rung = current.more_aggressive();
                }
                Err(err) => {
                    warn!(%err, ?current, "pdf recompression failed");
                    break;
                }
            }
        }

        CompressionResult::unchanged(bytes.to_vec(), AssetKind::Pdf)
    }

    /// One pass over the document at a fixed preset.
    fn recompress(bytes: &[u8], preset: QualityPreset) -> Result<Vec<u8>> {
        let mut doc = Document::load_mem(bytes)
            .map_err(|err| KompaktError::PdfError(format!("load failed: {}", err)))?;

        let image_ids: Vec<ObjectId> = doc
            .objects
            .iter()
            .filter_map(|(id, object)| match object {
                Object::Stream(stream) if is_image_xobject(stream) => Some(*id),
                _ => None,
            })
            .collect();

        debug!(images = image_ids.len(), "image xobjects found");

        for id in image_ids {
            let stream = match doc.get_object(id) {
                Ok(Object::Stream(stream)) => stream.clone(),
                _ => continue,
            };
            match rebuild_image(&doc, &stream, preset) {
                Some(rebuilt) => {
                    doc.objects.insert(id, Object::Stream(rebuilt));
                }
                None => debug!(?id, "image skipped"),
            }
        }

        doc.compress();
        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|err| KompaktError::PdfError(format!("save failed: {}", err)))?;
        Ok(output)
    }
}

fn is_image_xobject(stream: &Stream) -> bool {
    matches!(
        stream.dict.get(b"Subtype"),
        Ok(Object::Name(name)) if name == b"Image"
    )
}

/// First filter name on a stream, if any.
fn first_filter(dict: &Dictionary) -> Option<String> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(String::from_utf8_lossy(name).to_string()),
        Object::Array(filters) => filters.first().and_then(|f| match f {
            Object::Name(name) => Some(String::from_utf8_lossy(name).to_string()),
            _ => None,
        }),
        _ => None,
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key).ok()? {
        Object::Integer(n) if *n > 0 => Some(*n as u32),
        _ => None,
    }
}

/// Whether the stream's DecodeParms request predictor coding. Predictor
/// output inflates to row-filtered bytes, not raw samples, so such streams
/// must be left alone.
fn has_predictor(doc: &Document, dict: &Dictionary) -> bool {
    fn predictor_in(doc: &Document, object: &Object) -> bool {
        match object {
            Object::Dictionary(parms) => {
                matches!(parms.get(b"Predictor"), Ok(Object::Integer(p)) if *p > 1)
            }
            Object::Array(parts) => parts.iter().any(|part| predictor_in(doc, part)),
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(resolved) => predictor_in(doc, resolved),
                Err(_) => false,
            },
            _ => false,
        }
    }
    match dict.get(b"DecodeParms") {
        Ok(parms) => predictor_in(doc, parms),
        Err(_) => false,
    }
}

/// Resolve a ColorSpace entry to its family name.
fn color_space_name(doc: &Document, object: &Object) -> String {
    match object {
        Object::Name(name) => String::from_utf8_lossy(name).to_string(),
        Object::Array(parts) => match parts.first() {
            Some(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
            _ => String::new(),
        },
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(resolved) => color_space_name(doc, resolved),
            Err(_) => String::new(),
        },
        _ => String::new(),
    }
}

/// Decode one image XObject into pixels. `None` means the encoding is one
/// this pass does not handle and the stream should be left alone.
fn decode_image(doc: &Document, stream: &Stream, width: u32, height: u32) -> Option<DynamicImage> {
    match first_filter(&stream.dict).as_deref() {
        Some("DCTDecode") => {
            image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok()
        }
        Some("FlateDecode") | None => {
            if has_predictor(doc, &stream.dict) {
                return None;
            }
            let raw = match first_filter(&stream.dict).as_deref() {
                Some("FlateDecode") => {
                    let mut decoder = ZlibDecoder::new(&stream.content[..]);
                    let mut decoded = Vec::new();
                    decoder.read_to_end(&mut decoded).ok()?;
                    decoded
                }
                _ => stream.content.clone(),
            };

            let bits = dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
            if bits != 8 {
                return None;
            }
            let space = stream
                .dict
                .get(b"ColorSpace")
                .ok()
                .map(|cs| color_space_name(doc, cs))
                .unwrap_or_default();

            match space.as_str() {
                "DeviceRGB" => {
                    let expected = width as usize * height as usize * 3;
                    if raw.len() < expected {
                        return None;
                    }
                    image::RgbImage::from_raw(width, height, raw[..expected].to_vec())
                        .map(DynamicImage::ImageRgb8)
                }
                "DeviceGray" => {
                    let expected = width as usize * height as usize;
                    if raw.len() < expected {
                        return None;
                    }
                    image::GrayImage::from_raw(width, height, raw[..expected].to_vec())
                        .map(DynamicImage::ImageLuma8)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Rebuild an image XObject at the preset's scale and JPEG quality.
///
/// Images carrying an SMask keep their original dimensions (the mask's
/// dimensions must stay in step) but are still re-encoded; the SMask
/// reference is carried over to the new stream.
fn rebuild_image(doc: &Document, stream: &Stream, preset: QualityPreset) -> Option<Stream> {
    let width = dict_u32(&stream.dict, b"Width")?;
    let height = dict_u32(&stream.dict, b"Height")?;
    check_dimensions(width, height).ok()?;

    let smask = match stream.dict.get(b"SMask") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let image = decode_image(doc, stream, width, height)?;

    let (target_w, target_h) = if smask.is_some() {
        (width, height)
    } else {
        let scale = preset.pdf_image_scale();
        (
            ((width as f64 * scale).round() as u32).max(1),
            ((height as f64 * scale).round() as u32).max(1),
        )
    };

    let resized = if target_w < width || target_h < height {
        image.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
    } else {
        image
    };

    let quality = preset.pdf_jpeg_quality();
    let (jpeg, color_space) = match &resized {
        DynamicImage::ImageLuma8(gray) => {
            let mut buffer = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
            gray.write_with_encoder(encoder).ok()?;
            (buffer, b"DeviceGray".to_vec())
        }
        other => {
            let rgb = other.to_rgb8();
            let mut buffer = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder).ok()?;
            (buffer, b"DeviceRGB".to_vec())
        }
    };

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(resized.width() as i64));
    dict.set("Height", Object::Integer(resized.height() as i64));
    dict.set("ColorSpace", Object::Name(color_space));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    if let Some(smask_id) = smask {
        dict.set("SMask", Object::Reference(smask_id));
    }

    Some(Stream::new(dict, jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use lopdf::dictionary;
    use std::io::Write;

    /// A one-page PDF with a single Flate-compressed RGB image XObject.
    fn pdf_with_image(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x9E3779B97F4A7C15u64;
        let mut raw = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            raw.push((state & 0xFF) as u8);
            raw.push(((state >> 8) & 0xFF) as u8);
            raw.push(((state >> 16) & 0xFF) as u8);
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            compressed,
        )));
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            b"q 400 0 0 400 0 0 cm /Im0 Do Q".to_vec(),
        )));
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
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

    /// Like `pdf_with_image`, but the image stream is PNG-predictor coded:
    /// each row is prefixed with a filter byte and the dictionary carries
    /// the matching DecodeParms.
    fn pdf_with_predictor_image(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x9E3779B97F4A7C15u64;
        let mut filtered = Vec::with_capacity((height * (width * 3 + 1)) as usize);
        for _ in 0..height {
            filtered.push(0u8); // row filter: None
            for _ in 0..width {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                filtered.push((state & 0xFF) as u8);
                filtered.push(((state >> 8) & 0xFF) as u8);
                filtered.push(((state >> 16) & 0xFF) as u8);
            }
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&filtered).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
                "DecodeParms" => dictionary! {
                    "Predictor" => 15,
                    "Colors" => 3,
                    "BitsPerComponent" => 8,
                    "Columns" => width as i64,
                },
            },
            compressed,
        )));
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            b"q 400 0 0 400 0 0 cm /Im0 Do Q".to_vec(),
        )));
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
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

    /// A one-page PDF with no images at all.
    fn text_only_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (hello) Tj ET".to_vec(),
        )));
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
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
    fn garbage_input_passes_through_unchanged() {
        let bytes = b"not a pdf at all".to_vec();
        let result = PdfCompressor::compress(&bytes, QualityPreset::Medium);
        assert_eq!(result.bytes, bytes);
        assert_eq!(result.keep_ratio(), 1.0);
    }

    #[test]
    fn image_pdf_shrinks_and_keeps_its_page() {
        let input = pdf_with_image(256, 256);
        let result = PdfCompressor::compress(&input, QualityPreset::Low);
        assert!(result.bytes.len() < input.len());

        let reloaded = Document::load_mem(&result.bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }

    #[test]
    fn embedded_image_becomes_jpeg_and_is_downscaled() {
        let input = pdf_with_image(256, 256);
        let output = PdfCompressor::compress(&input, QualityPreset::Low).bytes;

        let doc = Document::load_mem(&output).unwrap();
        let image = doc
            .objects
            .values()
            .find_map(|object| match object {
                Object::Stream(stream) if is_image_xobject(stream) => Some(stream),
                _ => None,
            })
            .expect("image survives recompression");
        assert_eq!(first_filter(&image.dict).as_deref(), Some("DCTDecode"));
        // Low halves each dimension.
        assert_eq!(dict_u32(&image.dict, b"Width"), Some(128));
        assert_eq!(dict_u32(&image.dict, b"Height"), Some(128));
    }

    #[test]
    fn predictor_coded_image_is_left_untouched() {
        // Inflated predictor output is row-filtered, not raw samples;
        // re-encoding it as-is would corrupt the pixels.
        let input = pdf_with_predictor_image(64, 64);
        let result = PdfCompressor::compress(&input, QualityPreset::Low);

        let doc = Document::load_mem(&result.bytes).unwrap();
        let image = doc
            .objects
            .values()
            .find_map(|object| match object {
                Object::Stream(stream) if is_image_xobject(stream) => Some(stream),
                _ => None,
            })
            .expect("image stream still present");
        assert_eq!(first_filter(&image.dict).as_deref(), Some("FlateDecode"));
        assert_eq!(dict_u32(&image.dict, b"Width"), Some(64));
        assert_eq!(dict_u32(&image.dict, b"Height"), Some(64));
        assert!(image.dict.has(b"DecodeParms"));
    }

    #[test]
    fn incompressible_pdf_passes_through_unchanged() {
        let input = text_only_pdf();
        let result = PdfCompressor::compress(&input, QualityPreset::High);
        assert_eq!(result.bytes, input);
        assert_eq!(result.keep_ratio(), 1.0);
    }

    #[test]
    fn output_stays_stable_across_repeat_runs() {
        let input = pdf_with_image(128, 128);
        let once = PdfCompressor::compress(&input, QualityPreset::Medium).bytes;
        // A second pass over already-compressed output must not corrupt it.
        let twice = PdfCompressor::compress(&once, QualityPreset::Medium).bytes;
        assert_eq!(Document::load_mem(&twice).unwrap().get_pages().len(), 1);
    }
}
