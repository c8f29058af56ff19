// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The engine facade. Owns the dispatch policy: worker first, inline
// fallback when the worker fails or barely improves on the input, and a
// final guard that never returns output larger than the input.

use kompakt_core::config::EngineConfig;
use kompakt_core::types::{
    AssetKind, CompressionResult, OutputFormat, QualityPreset, SourceAsset,
};
use tracing::{debug, info, instrument, warn};

use crate::pdf::PdfCompressor;
use crate::strategy::{InlineSearchStrategy, SearchStrategy, WorkerSearchStrategy};
use crate::worker::{CompressRequest, PdfWorkerProvider};

/// Compresses images and PDFs. Cheap to share behind an `Arc`; all state is
/// the configuration plus the lazily-started PDF worker.
pub struct CompressionEngine {
    config: EngineConfig,
    worker: WorkerSearchStrategy,
    inline: InlineSearchStrategy,
    pdf_worker: PdfWorkerProvider,
}

impl CompressionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            worker: WorkerSearchStrategy,
            inline: InlineSearchStrategy,
            pdf_worker: PdfWorkerProvider::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compress any supported asset. Infallible: every failure mode
    /// degrades to returning the input unchanged.
    #[instrument(skip(self, source), fields(kind = ?source.kind(), input_len = source.len(), ?preset))]
    pub async fn compress(
        &self,
        source: SourceAsset,
        preset: QualityPreset,
        format: OutputFormat,
    ) -> CompressionResult {
        let kind = source.kind();
        if kind == AssetKind::Pdf {
            return self.compress_pdf(source.into_bytes(), preset).await;
        }

        let input_size = source.len();
        if input_size < self.config.min_bytes {
            debug!(input_size, "below size floor");
            return CompressionResult::unchanged(source.into_bytes(), kind);
        }

        let original = source.into_bytes();
        let request = CompressRequest::new(original.clone(), kind, preset, format);

        let candidate = match self.worker.compress(request, &self.config).await {
            Ok(result) if result.keep_ratio() < self.config.worker_improvement_epsilon => {
                Some(result)
            }
            Ok(result) => {
                debug!(
                    keep_ratio = result.keep_ratio(),
                    "worker result is a near-no-op, retrying inline"
                );
                self.retry_inline(&original, kind, preset, format, Some(result)).await
            }
            Err(err) => {
                warn!(%err, strategy = self.worker.name(), "worker failed, retrying inline");
                self.retry_inline(&original, kind, preset, format, None).await
            }
        };

        match candidate {
            Some(result) if result.compressed_size < input_size => {
                info!(
                    out_len = result.compressed_size,
                    keep_ratio = result.keep_ratio(),
                    "compression done"
                );
                result
            }
            _ => {
                info!("no strategy beat the original, passing through");
                CompressionResult::unchanged(original, kind)
            }
        }
    }

    /// Inline retry; keeps whichever of the two results is smaller.
    async fn retry_inline(
        &self,
        original: &[u8],
        kind: AssetKind,
        preset: QualityPreset,
        format: OutputFormat,
        worker_result: Option<CompressionResult>,
    ) -> Option<CompressionResult> {
        let request = CompressRequest::new(original.to_vec(), kind, preset, format);
        match self.inline.compress(request, &self.config).await {
            Ok(inline_result) => match worker_result {
                Some(from_worker) if from_worker.compressed_size <= inline_result.compressed_size => {
                    Some(from_worker)
                }
                _ => Some(inline_result),
            },
            Err(err) => {
                warn!(%err, strategy = self.inline.name(), "inline fallback failed");
                worker_result
            }
        }
    }

    /// Compress a PDF on the dedicated worker thread, falling back to an
    /// inline pass if the worker is unavailable.
    #[instrument(skip(self, bytes), fields(input_len = bytes.len(), ?preset))]
    pub async fn compress_pdf(&self, bytes: Vec<u8>, preset: QualityPreset) -> CompressionResult {
        if (bytes.len() as u64) < self.config.min_bytes {
            debug!("below size floor");
            return CompressionResult::unchanged(bytes, AssetKind::Pdf);
        }

        let handle = self.pdf_worker.get_or_create().await;
        match handle.compress(bytes.clone(), preset).await {
            Ok(result) => result,
            Err(err) => {
                warn!(%err, "pdf worker unavailable, compressing inline");
                PdfCompressor::compress(&bytes, preset)
            }
        }
    }
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
