// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-target resizing. No search loop; one decode, one render.

use kompakt_core::error::{KompaktError, Result};
use kompakt_core::types::{OutputFormat, SourceAsset};
use kompakt_raster::Rasterizer;
use tracing::{debug, instrument};

use crate::ToolOutput;

/// How the target dimensions are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Resize to exactly `width` x `height`, ignoring aspect ratio.
    Exact,
    /// Largest size that fits inside `width` x `height` while keeping the
    /// source aspect ratio. Never upscales.
    Fit,
}

/// Resize an image to the given dimensions and re-encode it.
///
/// `quality` is the fixed encode quality in `[0, 1]`; it only applies to
/// lossy targets.
#[instrument(skip(source), fields(kind = ?source.kind(), width, height, ?mode))]
pub fn resize(
    source: &SourceAsset,
    width: u32,
    height: u32,
    mode: ResizeMode,
    format: OutputFormat,
    quality: f64,
) -> Result<ToolOutput> {
    if width == 0 || height == 0 {
        return Err(KompaktError::ImageError(format!(
            "invalid resize target {}x{}",
            width, height
        )));
    }

    let raster = Rasterizer::from_bytes(source.bytes())?;
    let (target_w, target_h) = match mode {
        ResizeMode::Exact => (width, height),
        ResizeMode::Fit => fit_within(raster.width(), raster.height(), width, height),
    };
    debug!(target_w, target_h, "resize target resolved");

    let target = format.resolve(source.kind());
    let bytes = if target.is_lossy_encodable() {
        raster.render_lossy(target_w, target_h, target, quality)?
    } else {
        raster.render_png(target_w, target_h, 0)?
    };

    Ok(ToolOutput { bytes, kind: target })
}

/// Largest aspect-preserving size inside the `max_w` x `max_h` box, never
/// exceeding the source dimensions.
fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    (
        ((src_w as f64 * scale).round() as u32).max(1),
        ((src_h as f64 * scale).round() as u32).max(1),
    )
}
