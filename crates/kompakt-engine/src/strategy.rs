// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatch strategies. Both run the same blocking pipeline; they differ
// only in where it executes.

use async_trait::async_trait;
use kompakt_core::config::EngineConfig;
use kompakt_core::error::Result;
use kompakt_core::types::{CompressionResult, SourceAsset};
use tracing::instrument;

use crate::pipeline;
use crate::worker::{CompressRequest, run_worker};

/// Where a compression search runs.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compress(
        &self,
        request: CompressRequest,
        config: &EngineConfig,
    ) -> Result<CompressionResult>;
}

/// Runs the search on the blocking thread pool.
pub struct WorkerSearchStrategy;

#[async_trait]
impl SearchStrategy for WorkerSearchStrategy {
    fn name(&self) -> &'static str {
        "worker"
    }

    #[instrument(skip_all, fields(task_id = %request.task_id))]
    async fn compress(
        &self,
        request: CompressRequest,
        config: &EngineConfig,
    ) -> Result<CompressionResult> {
        run_worker(request, config.clone()).await.into_result()
    }
}

/// Runs the search right here, blocking the caller. The fallback path when
/// the worker fails or barely improves on the input.
pub struct InlineSearchStrategy;

#[async_trait]
impl SearchStrategy for InlineSearchStrategy {
    fn name(&self) -> &'static str {
        "inline"
    }

    #[instrument(skip_all, fields(task_id = %request.task_id))]
    async fn compress(
        &self,
        request: CompressRequest,
        config: &EngineConfig,
    ) -> Result<CompressionResult> {
        let task_id = request.task_id;
        let source = SourceAsset::new(request.bytes, request.kind);
        let mut result =
            pipeline::compress_blocking(source, request.preset, request.format, config)?;
        result.task_id = task_id;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use kompakt_core::types::{AssetKind, MIN_BYTES, OutputFormat, QualityPreset};
    use std::io::Cursor;

    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x2545F4914F6CDD1Du64;
        let img = RgbaImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            Rgba([
                (state & 0xFF) as u8,
                ((state >> 8) & 0xFF) as u8,
                ((state >> 16) & 0xFF) as u8,
                255,
            ])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn both_strategies_produce_identical_bytes() {
        // Large enough that the bisection actually runs on both paths.
        let bytes = noisy_png(300, 300);
        assert!(bytes.len() as u64 > MIN_BYTES);
        let config = EngineConfig::default();

        let worker_result = WorkerSearchStrategy
            .compress(
                CompressRequest::new(
                    bytes.clone(),
                    AssetKind::Png,
                    QualityPreset::Medium,
                    OutputFormat::Auto,
                ),
                &config,
            )
            .await
            .unwrap();
        let inline_result = InlineSearchStrategy
            .compress(
                CompressRequest::new(
                    bytes.clone(),
                    AssetKind::Png,
                    QualityPreset::Medium,
                    OutputFormat::Auto,
                ),
                &config,
            )
            .await
            .unwrap();

        // The search ran: output shrank rather than passing through.
        assert!(worker_result.compressed_size < worker_result.original_size);
        assert_eq!(worker_result.bytes, inline_result.bytes);
        assert_eq!(worker_result.keep_ratio(), inline_result.keep_ratio());
        assert_eq!(worker_result.output_kind, inline_result.output_kind);
    }

    #[test]
    fn strategy_names_differ() {
        assert_ne!(WorkerSearchStrategy.name(), InlineSearchStrategy.name());
    }
}
