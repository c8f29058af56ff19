// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The blocking compression pipeline. Both dispatch paths (background worker
// and inline fallback) run exactly this code, so a fallback never produces
// different bytes for the same input and parameters.

use kompakt_core::config::EngineConfig;
use kompakt_core::error::Result;
use kompakt_core::types::{
    AssetKind, CompressionResult, LOSSY_QUALITY_BRACKET, OutputFormat, PNG_SCALE_BRACKET,
    QualityPreset, SourceAsset,
};
use kompakt_raster::raster::MIN_RENDER_DIM;
use kompakt_raster::{Rasterizer, cap_dimensions};
use tracing::{debug, info, instrument, warn};

use crate::search::{SearchOutcome, run_search};

/// Compress a raster image towards the preset's keep-ratio band.
///
/// Never fails on bad input: undecodable bytes, tiny files, and searches
/// that cannot beat the original all come back as an unchanged result with
/// keep ratio 1.0. Errors surface only for genuine infrastructure faults.
#[instrument(skip(source, config), fields(kind = ?source.kind(), ?preset, input_len = source.len()))]
pub fn compress_blocking(
    source: SourceAsset,
    preset: QualityPreset,
    format: OutputFormat,
    config: &EngineConfig,
) -> Result<CompressionResult> {
    let input_size = source.len();
    let input_kind = source.kind();

    if input_size < config.min_bytes {
        debug!(input_size, "below size floor, passing through");
        return Ok(CompressionResult::unchanged(source.into_bytes(), input_kind));
    }

    let target = format.resolve(input_kind);

    let raster = match Rasterizer::from_bytes(source.bytes()) {
        Ok(raster) => raster,
        Err(err) => {
            warn!(%err, "decode failed, passing input through");
            return Ok(CompressionResult::unchanged(source.into_bytes(), input_kind));
        }
    };

    let (capped_w, capped_h) =
        cap_dimensions(raster.width(), raster.height(), preset.max_dimension());

    let outcome = if target.is_lossy_encodable() {
        search_lossy(&raster, capped_w, capped_h, target, preset, input_size, config)?
    } else {
        search_png(&raster, capped_w, capped_h, preset, input_size, config)?
    };

    let best = outcome.best;
    if best.bytes.len() as u64 >= input_size {
        info!(
            out_len = best.bytes.len(),
            input_size, "search could not beat the original, passing through"
        );
        return Ok(CompressionResult::unchanged(source.into_bytes(), input_kind));
    }

    info!(
        out_len = best.bytes.len(),
        keep_ratio = best.keep_ratio,
        in_band = outcome.in_band,
        attempts = outcome.attempts,
        "compressed"
    );
    Ok(CompressionResult::new(best.bytes, input_size, target))
}

/// Quality bisection at fixed (capped) dimensions.
fn search_lossy(
    raster: &Rasterizer,
    width: u32,
    height: u32,
    target: AssetKind,
    preset: QualityPreset,
    input_size: u64,
    config: &EngineConfig,
) -> Result<SearchOutcome> {
    run_search(
        preset.band(),
        input_size,
        preset.initial_quality(),
        LOSSY_QUALITY_BRACKET,
        config.iteration_budget,
        |quality| raster.render_lossy(width, height, target, quality),
    )
}

/// Downscale bisection with preset colour quantization for PNG output.
///
/// The scale parameter multiplies the already-capped dimensions, so the
/// preset's pixel cap holds at every step of the search.
fn search_png(
    raster: &Rasterizer,
    capped_w: u32,
    capped_h: u32,
    preset: QualityPreset,
    input_size: u64,
    config: &EngineConfig,
) -> Result<SearchOutcome> {
    let shift = preset.png_shift();
    run_search(
        preset.band(),
        input_size,
        preset.png_initial_scale(),
        PNG_SCALE_BRACKET,
        config.iteration_budget,
        |scale| {
            let w = ((capped_w as f64 * scale).round() as u32).max(MIN_RENDER_DIM);
            let h = ((capped_h as f64 * scale).round() as u32).max(MIN_RENDER_DIM);
            raster.render_png(w, h, shift)
        },
    )
}
