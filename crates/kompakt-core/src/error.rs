// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kompakt.

use thiserror::Error;

/// Top-level error type for all Kompakt operations.
#[derive(Debug, Error)]
pub enum KompaktError {
    // -- Raster errors --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image exceeds safe dimensions: {0}")]
    ImageTooLarge(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    // -- Engine errors --
    #[error("worker path failed: {0}")]
    WorkerError(String),

    #[error("QR generation failed: {0}")]
    QrError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KompaktError>;
