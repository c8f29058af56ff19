// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format conversion at a fixed quality. A target without an encoder falls
// back to JPEG rather than failing, so a conversion request always yields
// a usable file.

use kompakt_core::error::Result;
use kompakt_core::types::{AssetKind, SourceAsset};
use kompakt_raster::Rasterizer;
use tracing::{instrument, warn};

use crate::ToolOutput;

/// Re-encode an image into `target` at `quality` (`[0, 1]`, lossy targets
/// only). Pixel dimensions are preserved.
#[instrument(skip(source), fields(kind = ?source.kind(), ?target, quality))]
pub fn convert(source: &SourceAsset, target: AssetKind, quality: f64) -> Result<ToolOutput> {
    let raster = Rasterizer::from_bytes(source.bytes())?;

    let target = match target {
        AssetKind::Jpeg | AssetKind::WebP | AssetKind::Png => target,
        other => {
            warn!(requested = ?other, "no encoder for target, falling back to JPEG");
            AssetKind::Jpeg
        }
    };

    let bytes = raster.encode(target, quality)?;
    Ok(ToolOutput { bytes, kind: target })
}
