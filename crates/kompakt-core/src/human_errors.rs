// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the UI layer.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Compression itself never surfaces errors (a failed search just returns the
// original bytes), so most of these cover the structural adapters.

use crate::error::KompaktError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth retrying — transient condition.
    Transient,
    /// User must supply a different file or setting.
    ActionRequired,
    /// Cannot be fixed by retrying — damaged or unsupported input.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the operation is worth retrying as-is.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `KompaktError` into a `HumanError` suitable for a toast or dialog.
pub fn humanize_error(err: &KompaktError) -> HumanError {
    match err {
        KompaktError::Decode(_) | KompaktError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        KompaktError::Encode(detail) => HumanError {
            message: "The converted file couldn't be created.".into(),
            suggestion: format!("Try a different output format. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        KompaktError::ImageTooLarge(_) => HumanError {
            message: "This image is too large to process safely.".into(),
            suggestion: "Resize the image below 32,000 pixels per side and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        KompaktError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it on a computer first to check it works.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        KompaktError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!("Try converting the file to JPEG, PNG, WebP, or PDF first. (File type: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        KompaktError::WorkerError(_) => HumanError {
            message: "Background processing hit a problem.".into(),
            suggestion: "The file was processed directly instead; if the result looks wrong, try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        KompaktError::QrError(_) => HumanError {
            message: "The QR code couldn't be generated.".into(),
            suggestion: "The text may be too long for the selected error correction level. Shorten it or lower the level.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        KompaktError::Io(_) => HumanError {
            message: "The file couldn't be read or written.".into(),
            suggestion: "Check that the file still exists and there is free disk space, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        KompaktError::Serialization(_) => HumanError {
            message: "A settings file couldn't be read.".into(),
            suggestion: "The configuration may be corrupted. Resetting settings to defaults should fix this.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
