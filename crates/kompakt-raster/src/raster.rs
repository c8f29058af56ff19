// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster surface — decodes a source image once and renders encoded variants
// of it at varying size and quality. Stateless per render call; the engine
// drives it repeatedly during the bisection search.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};
use kompakt_core::error::{KompaktError, Result};
use kompakt_core::types::AssetKind;
use tracing::{debug, instrument};

use crate::quantize;

/// Maximum allowed image dimension (width or height). Larger inputs are
/// rejected as decompression bombs.
pub const MAX_DIMENSION: u32 = 32_768;

/// Maximum allowed total pixels. 100 megapixels is 400 MB of RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

/// Neither render dimension ever drops below this.
pub const MIN_RENDER_DIM: u32 = 16;

/// A decoded source image plus render primitives.
///
/// Construction decodes exactly once; every `render_*` call re-samples and
/// re-encodes from the same decoded pixels.
pub struct Rasterizer {
    image: DynamicImage,
}

impl Rasterizer {
    /// Decode raw encoded bytes (JPEG, PNG, WebP, GIF, BMP, TIFF).
    ///
    /// Dimensions are probed from the header first so oversized inputs are
    /// rejected before pixel allocation.
    #[instrument(skip_all, fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| KompaktError::Decode(format!("cannot sniff format: {}", err)))?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|err| KompaktError::Decode(format!("cannot read header: {}", err)))?;
        check_dimensions(width, height)?;

        let image = image::load_from_memory(data)
            .map_err(|err| KompaktError::Decode(format!("failed to decode image: {}", err)))?;

        debug!(width = image.width(), height = image.height(), "image decoded");
        Ok(Self { image })
    }

    /// Wrap an already-decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying decoded image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Render the image at exactly `width` x `height` and encode it with a
    /// lossy codec at `quality` in `[0, 1]`.
    ///
    /// JPEG output is composited onto a white background first, since JPEG
    /// has no alpha channel and transparent regions would otherwise go black.
    #[instrument(skip(self), fields(width, height, ?target, quality))]
    pub fn render_lossy(
        &self,
        width: u32,
        height: u32,
        target: AssetKind,
        quality: f64,
    ) -> Result<Vec<u8>> {
        let width = width.max(MIN_RENDER_DIM);
        let height = height.max(MIN_RENDER_DIM);
        let resized = self
            .image
            .resize_exact(width, height, image::imageops::FilterType::Lanczos3);

        match target {
            AssetKind::Jpeg => {
                let rgb = flatten_onto_white(&resized);
                let mut buffer = Vec::new();
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buffer,
                    quality_to_percent(quality),
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|err| KompaktError::Encode(format!("JPEG encoding failed: {}", err)))?;
                Ok(buffer)
            }
            AssetKind::WebP => {
                let rgba = resized.to_rgba8();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
                let encoded = encoder.encode(quality_to_percent(quality) as f32);
                Ok(encoded.to_vec())
            }
            other => Err(KompaktError::UnsupportedFormat(format!(
                "no lossy encoder for {}",
                other.mime_type()
            ))),
        }
    }

    /// Render the image at `width` x `height` with the low `shift` bits of
    /// each RGB channel masked off, then PNG-encode.
    ///
    /// PNG is lossless, so byte savings come from spatial resolution and
    /// colour precision. `shift == 0` at the source dimensions reproduces
    /// the source raster pixel for pixel.
    #[instrument(skip(self), fields(width, height, shift))]
    pub fn render_png(&self, width: u32, height: u32, shift: u8) -> Result<Vec<u8>> {
        let width = width.max(MIN_RENDER_DIM);
        let height = height.max(MIN_RENDER_DIM);

        let resized = if width == self.image.width() && height == self.image.height() {
            self.image.clone()
        } else {
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
        };

        let mut rgba = resized.to_rgba8();
        if shift > 0 {
            quantize::mask_low_bits(&mut rgba, shift);
        }

        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| KompaktError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the image as-is in the given format at a fixed quality.
    /// One-shot path for the convert/resize/crop adapters.
    pub fn encode(&self, target: AssetKind, quality: f64) -> Result<Vec<u8>> {
        match target {
            AssetKind::Jpeg | AssetKind::WebP => {
                self.render_lossy(self.image.width(), self.image.height(), target, quality)
            }
            AssetKind::Png => self.render_png(self.image.width(), self.image.height(), 0),
            other => Err(KompaktError::UnsupportedFormat(format!(
                "no encoder for {}",
                other.mime_type()
            ))),
        }
    }
}

/// Uniformly downscale (never upscale) so the larger dimension equals
/// `max_dim`, preserving aspect ratio. Floors at 16 px per side.
pub fn cap_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let larger = width.max(height);
    if larger <= max_dim {
        return (width.max(MIN_RENDER_DIM), height.max(MIN_RENDER_DIM));
    }
    let s = max_dim as f64 / larger as f64;
    (
        ((width as f64 * s).round() as u32).max(MIN_RENDER_DIM),
        ((height as f64 * s).round() as u32).max(MIN_RENDER_DIM),
    )
}

/// Reject images whose claimed dimensions would make decoding unsafe.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(KompaktError::Decode("zero-sized image".into()));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(KompaktError::ImageTooLarge(format!(
            "{}x{} exceeds the {} px per-side limit",
            width, height, MAX_DIMENSION
        )));
    }
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(KompaktError::ImageTooLarge(format!(
            "{}x{} exceeds the {} pixel limit",
            width, height, MAX_PIXELS
        )));
    }
    Ok(())
}

/// Map a `[0, 1]` quality parameter to the 1-100 range the encoders take.
fn quality_to_percent(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Composite an image onto an opaque white background, returning RGB.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let a = a as u16;
        let blend = |c: u8| -> u8 { ((c as u16 * a + 255 * (255 - a)) / 255) as u8 };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
