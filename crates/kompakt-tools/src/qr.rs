// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR code generation: text in, PNG bytes or SVG markup out.

use image::{DynamicImage, Luma};
use kompakt_core::error::{KompaktError, Result};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Smallest supported symbol edge in pixels.
pub const MIN_SIZE: u32 = 128;
/// Largest supported symbol edge in pixels.
pub const MAX_SIZE: u32 = 1024;

/// Error correction level, in increasing order of redundancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    fn level(self) -> EcLevel {
        match self {
            Self::Low => EcLevel::L,
            Self::Medium => EcLevel::M,
            Self::Quartile => EcLevel::Q,
            Self::High => EcLevel::H,
        }
    }
}

/// Symbol rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrOptions {
    /// Requested edge length in pixels, clamped to `[128, 1024]`. The
    /// rendered symbol may be slightly larger to keep whole modules.
    pub size: u32,
    /// Whether to surround the symbol with a quiet zone.
    pub quiet_zone: bool,
    pub error_correction: ErrorCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            size: 256,
            quiet_zone: true,
            error_correction: ErrorCorrection::Medium,
        }
    }
}

/// Renders QR symbols for arbitrary text payloads.
pub struct QrGenerator {
    options: QrOptions,
}

impl QrGenerator {
    pub fn new(options: QrOptions) -> Self {
        Self { options }
    }

    fn encode(&self, text: &str) -> Result<QrCode> {
        if text.is_empty() {
            return Err(KompaktError::QrError("empty payload".into()));
        }
        QrCode::with_error_correction_level(text, self.options.error_correction.level())
            .map_err(|err| KompaktError::QrError(format!("encoding failed: {}", err)))
    }

    fn edge(&self) -> u32 {
        self.options.size.clamp(MIN_SIZE, MAX_SIZE)
    }

    /// Render as a grayscale PNG.
    #[instrument(skip(self, text), fields(text_len = text.len(), size = self.edge()))]
    pub fn to_png(&self, text: &str) -> Result<Vec<u8>> {
        let code = self.encode(text)?;
        let edge = self.edge();
        let symbol = code
            .render::<Luma<u8>>()
            .min_dimensions(edge, edge)
            .quiet_zone(self.options.quiet_zone)
            .build();
        debug!(width = symbol.width(), height = symbol.height(), "qr rendered");

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(symbol)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|err| KompaktError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(bytes)
    }

    /// Render as an SVG document string.
    #[instrument(skip(self, text), fields(text_len = text.len(), size = self.edge()))]
    pub fn to_svg(&self, text: &str) -> Result<String> {
        let code = self.encode(text)?;
        let edge = self.edge();
        Ok(code
            .render::<svg::Color>()
            .min_dimensions(edge, edge)
            .quiet_zone(self.options.quiet_zone)
            .build())
    }
}

impl Default for QrGenerator {
    fn default() -> Self {
        Self::new(QrOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_output_meets_the_requested_size() {
        let generator = QrGenerator::new(QrOptions { size: 256, ..QrOptions::default() });
        let png = generator.to_png("https://example.com").unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(decoded.width() >= 256);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn size_is_clamped_into_the_supported_range() {
        let generator = QrGenerator::new(QrOptions { size: 16, ..QrOptions::default() });
        let png = generator.to_png("hello").unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(decoded.width() >= MIN_SIZE);
    }

    #[test]
    fn svg_output_is_a_complete_document() {
        let generator = QrGenerator::default();
        let markup = generator.to_svg("kompakt").unwrap();
        assert!(markup.starts_with("<?xml"));
        assert!(markup.contains("<svg"));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(QrGenerator::default().to_png("").is_err());
    }

    #[test]
    fn oversized_payload_is_an_error() {
        // QR capacity at EC High tops out well below 8 KiB.
        let huge = "x".repeat(8 * 1024);
        let generator = QrGenerator::new(QrOptions {
            error_correction: ErrorCorrection::High,
            ..QrOptions::default()
        });
        assert!(generator.to_png(&huge).is_err());
    }

    #[test]
    fn options_round_trip_through_json() {
        let options = QrOptions { size: 512, quiet_zone: false, error_correction: ErrorCorrection::Quartile };
        let json = serde_json::to_string(&options).unwrap();
        let back: QrOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.size, 512);
        assert_eq!(back.error_correction, ErrorCorrection::Quartile);
    }
}
