// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sub-rectangle cropping with bounds clamping.

use kompakt_core::error::{KompaktError, Result};
use kompakt_core::types::{OutputFormat, SourceAsset};
use kompakt_raster::Rasterizer;
use tracing::{debug, instrument};

use crate::ToolOutput;

/// Requested crop region in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Clamp the rectangle to the image bounds. Returns `None` when no area
    /// is left.
    fn clamped(&self, image_w: u32, image_h: u32) -> Option<CropRect> {
        if self.x >= image_w || self.y >= image_h {
            return None;
        }
        let width = self.width.min(image_w - self.x);
        let height = self.height.min(image_h - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(CropRect { x: self.x, y: self.y, width, height })
    }
}

/// Crop an image to `rect` (clamped to the image bounds) and re-encode at a
/// fixed quality.
#[instrument(skip(source), fields(kind = ?source.kind(), ?rect))]
pub fn crop(
    source: &SourceAsset,
    rect: CropRect,
    format: OutputFormat,
    quality: f64,
) -> Result<ToolOutput> {
    let raster = Rasterizer::from_bytes(source.bytes())?;

    let clamped = rect.clamped(raster.width(), raster.height()).ok_or_else(|| {
        KompaktError::ImageError(format!(
            "crop {:?} lies outside a {}x{} image",
            rect,
            raster.width(),
            raster.height()
        ))
    })?;
    debug!(?clamped, "crop region resolved");

    let cropped = raster
        .as_dynamic()
        .crop_imm(clamped.x, clamped.y, clamped.width, clamped.height);
    let target = format.resolve(source.kind());
    let bytes = Rasterizer::from_dynamic(cropped).encode(target, quality)?;

    Ok(ToolOutput { bytes, kind: target })
}
