// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kompakt-raster — The raster surface underneath the compression engine and
// the one-shot adapters.
//
// Provides decoding with decompression-bomb guards, quality-parameterised
// lossy re-encoding (JPEG/WebP), scale-parameterised PNG re-encoding with
// colour quantization, and the shared dimension-cap arithmetic.

pub mod quantize;
pub mod raster;

pub use raster::{Rasterizer, cap_dimensions};
