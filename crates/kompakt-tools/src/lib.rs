// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kompakt-tools — One-shot adapters on top of the raster and PDF layers.
//
// Unlike the compression engine these perform a single deterministic
// transform per call: resize, crop, format conversion, PDF merge/split,
// image-to-PDF assembly, and QR generation.

pub mod compose;
pub mod convert;
pub mod crop;
pub mod pdf_ops;
pub mod qr;
pub mod resize;

use kompakt_core::types::AssetKind;

pub use compose::{PaperSize, PdfComposer};
pub use convert::convert;
pub use crop::{CropRect, crop};
pub use pdf_ops::{MergeOutcome, MergeSkip, PdfToolkit};
pub use qr::{ErrorCorrection, QrOptions, QrGenerator};
pub use resize::{ResizeMode, resize};

/// Encoded output of a raster adapter.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub bytes: Vec<u8>,
    pub kind: AssetKind,
}
