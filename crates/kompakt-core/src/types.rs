// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Kompakt file toolkit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Iteration budget for the bisection search.
pub const BINARY_SEARCH_ITERATIONS: u32 = 8;

/// Files below this size are returned unchanged — an encode/decode round
/// trip on a tiny file costs more than it saves.
pub const MIN_BYTES: u64 = 10 * 1024;

/// Quality bracket searched for lossy (JPEG/WebP) encoding.
pub const LOSSY_QUALITY_BRACKET: (f64, f64) = (0.01, 0.95);

/// Downscale bracket searched for PNG encoding.
pub const PNG_SCALE_BRACKET: (f64, f64) = (0.10, 1.0);

/// A worker result keeping at least this fraction of the original bytes is
/// treated as a near-no-op and triggers the inline fallback.
pub const WORKER_IMPROVEMENT_EPSILON: f64 = 0.98;

/// Unique identifier for one compression or conversion invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical input/output formats the toolkit understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Pdf,
}

impl AssetKind {
    /// MIME type string for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Pdf => "application/pdf",
        }
    }

    /// Preferred file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Pdf => "pdf",
        }
    }

    /// Parse a declared MIME type. `image/jpg` is accepted as an alias for
    /// `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            "image/bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Infer format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether this format is a raster image (as opposed to a PDF document).
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }

    /// Whether an encoder with a continuous quality knob exists for this
    /// format. PNG is a lossless container and is searched on scale instead.
    pub fn is_lossy_encodable(&self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP)
    }
}

/// An immutable input file: raw bytes plus the declared format.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    bytes: Vec<u8>,
    kind: AssetKind,
}

impl SourceAsset {
    pub fn new(bytes: Vec<u8>, kind: AssetKind) -> Self {
        Self { bytes, kind }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Byte length of the source.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the asset and take back its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// The keep-ratio range a preset aims to land within.
///
/// `output_size / input_size` inside `[min, max]` counts as a hit; lower
/// means more compression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBand {
    pub min: f64,
    pub max: f64,
}

impl TargetBand {
    pub fn contains(&self, keep_ratio: f64) -> bool {
        keep_ratio >= self.min && keep_ratio <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Named compression aggressiveness presets.
///
/// Each preset bundles a target keep-ratio band with format-specific
/// starting parameters. One canonical band table is used for every code
/// path (image worker, inline fallback, and PDF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Keep 20-50% of the original bytes (most aggressive).
    Low,
    /// Keep 50-80%.
    Medium,
    /// Keep 80-90% (gentlest).
    High,
}

impl QualityPreset {
    /// The target keep-ratio band.
    pub fn band(&self) -> TargetBand {
        match self {
            Self::Low => TargetBand { min: 0.20, max: 0.50 },
            Self::Medium => TargetBand { min: 0.50, max: 0.80 },
            Self::High => TargetBand { min: 0.80, max: 0.90 },
        }
    }

    /// Pixel cap on the larger image dimension before any encode attempt.
    pub fn max_dimension(&self) -> u32 {
        match self {
            Self::Low => 2048,
            Self::Medium => 3072,
            Self::High => 4096,
        }
    }

    /// Seed quality for the lossy bisection search, in `[0, 1]`.
    pub fn initial_quality(&self) -> f64 {
        match self {
            Self::Low => 0.15,
            Self::Medium => 0.40,
            Self::High => 0.65,
        }
    }

    /// Bits masked off each RGB channel when re-encoding PNG.
    pub fn png_shift(&self) -> u8 {
        match self {
            Self::Low => 4,
            Self::Medium => 2,
            Self::High => 0,
        }
    }

    /// Seed downscale factor for the PNG bisection search.
    pub fn png_initial_scale(&self) -> f64 {
        match self {
            Self::Low => 0.50,
            Self::Medium => 0.75,
            Self::High => 0.95,
        }
    }

    /// Downscale factor applied to embedded PDF images.
    pub fn pdf_image_scale(&self) -> f64 {
        match self {
            Self::Low => 0.50,
            Self::Medium => 0.70,
            Self::High => 0.85,
        }
    }

    /// JPEG quality (1-100) for re-encoded PDF images.
    pub fn pdf_jpeg_quality(&self) -> u8 {
        match self {
            Self::Low => 40,
            Self::Medium => 60,
            Self::High => 80,
        }
    }

    /// The next more aggressive preset, used by the PDF escalation ladder.
    /// `Low` is already the most aggressive and has nowhere to go.
    pub fn more_aggressive(&self) -> Option<Self> {
        match self {
            Self::High => Some(Self::Medium),
            Self::Medium => Some(Self::Low),
            Self::Low => None,
        }
    }
}

/// User-facing output format choice for image compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pick based on the source: PNG sources become WebP (alpha-preserving
    /// and smaller than PNG), everything else becomes JPEG.
    Auto,
    Jpeg,
    WebP,
    Png,
}

impl OutputFormat {
    /// Resolve to a concrete output format for the given source. Resolved
    /// once at the start of an engine invocation and fixed for the search.
    pub fn resolve(&self, source: AssetKind) -> AssetKind {
        match self {
            Self::Jpeg => AssetKind::Jpeg,
            Self::WebP => AssetKind::WebP,
            Self::Png => AssetKind::Png,
            Self::Auto => match source {
                AssetKind::Png => AssetKind::WebP,
                AssetKind::WebP => AssetKind::WebP,
                // Anything without a lossy encoder of its own re-encodes
                // as JPEG.
                _ => AssetKind::Jpeg,
            },
        }
    }
}

/// The engine's output: final bytes plus size bookkeeping.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub task_id: TaskId,
    pub bytes: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub output_kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

impl CompressionResult {
    pub fn new(bytes: Vec<u8>, original_size: u64, output_kind: AssetKind) -> Self {
        let compressed_size = bytes.len() as u64;
        Self {
            task_id: TaskId::new(),
            bytes,
            original_size,
            compressed_size,
            output_kind,
            created_at: Utc::now(),
        }
    }

    /// Build a result that passes the input through unchanged (ratio 1.0).
    pub fn unchanged(bytes: Vec<u8>, kind: AssetKind) -> Self {
        let size = bytes.len() as u64;
        let mut result = Self::new(bytes, size, kind);
        result.compressed_size = size;
        result
    }

    /// `compressed_size / original_size`; 1.0 when nothing was saved.
    pub fn keep_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.compressed_size as f64 / self.original_size as f64
    }
}
