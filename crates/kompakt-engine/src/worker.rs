// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker dispatch.
//
// Image searches run per-invocation on the blocking pool. PDF work goes to
// a single dedicated thread created on first use, since lopdf documents can
// occupy hundreds of megabytes and serialising PDF jobs bounds peak memory.

use kompakt_core::config::EngineConfig;
use kompakt_core::error::{KompaktError, Result};
use kompakt_core::types::{AssetKind, CompressionResult, OutputFormat, QualityPreset, SourceAsset, TaskId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument};

use crate::pdf::PdfCompressor;
use crate::pipeline;

/// One unit of image compression work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressRequest {
    pub task_id: TaskId,
    pub bytes: Vec<u8>,
    pub kind: AssetKind,
    pub preset: QualityPreset,
    pub format: OutputFormat,
}

impl CompressRequest {
    pub fn new(bytes: Vec<u8>, kind: AssetKind, preset: QualityPreset, format: OutputFormat) -> Self {
        Self { task_id: TaskId::new(), bytes, kind, preset, format }
    }
}

/// Status-tagged worker reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompressReply {
    Ok {
        task_id: TaskId,
        bytes: Vec<u8>,
        original_size: u64,
        output_kind: AssetKind,
    },
    Err {
        task_id: TaskId,
        message: String,
    },
}

impl CompressReply {
    pub fn from_result(task_id: TaskId, result: Result<CompressionResult>) -> Self {
        match result {
            Ok(result) => Self::Ok {
                task_id,
                bytes: result.bytes,
                original_size: result.original_size,
                output_kind: result.output_kind,
            },
            Err(err) => Self::Err { task_id, message: err.to_string() },
        }
    }

    pub fn into_result(self) -> Result<CompressionResult> {
        match self {
            Self::Ok { task_id, bytes, original_size, output_kind } => {
                let mut result = CompressionResult::new(bytes, original_size, output_kind);
                result.task_id = task_id;
                Ok(result)
            }
            Self::Err { message, .. } => Err(KompaktError::WorkerError(message)),
        }
    }
}

/// Run one image request on the blocking pool.
#[instrument(skip(request, config), fields(task_id = %request.task_id))]
pub async fn run_worker(request: CompressRequest, config: EngineConfig) -> CompressReply {
    let task_id = request.task_id;
    let handle = tokio::task::spawn_blocking(move || {
        let source = SourceAsset::new(request.bytes, request.kind);
        pipeline::compress_blocking(source, request.preset, request.format, &config)
    });
    match handle.await {
        Ok(result) => CompressReply::from_result(task_id, result),
        Err(join_err) => {
            error!(%join_err, "image worker task aborted");
            CompressReply::from_result(
                task_id,
                Err(KompaktError::WorkerError(format!("worker task aborted: {}", join_err))),
            )
        }
    }
}

struct PdfJob {
    bytes: Vec<u8>,
    preset: QualityPreset,
    reply: oneshot::Sender<CompressionResult>,
}

/// Handle onto the dedicated PDF worker thread.
#[derive(Clone)]
pub struct PdfWorkerHandle {
    sender: mpsc::Sender<PdfJob>,
}

impl PdfWorkerHandle {
    fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::channel::<PdfJob>(16);
        std::thread::Builder::new()
            .name("kompakt-pdf-worker".into())
            .spawn(move || {
                info!("pdf worker thread started");
                while let Some(job) = receiver.blocking_recv() {
                    let result = PdfCompressor::compress(&job.bytes, job.preset);
                    // The requester may have gone away; nothing to do then.
                    let _ = job.reply.send(result);
                }
                info!("pdf worker thread stopped");
            })
            // Thread spawn only fails when the process is out of resources;
            // jobs will then fail at send time with a closed channel.
            .ok();
        Self { sender }
    }

    /// Compress a PDF on the worker thread.
    pub async fn compress(&self, bytes: Vec<u8>, preset: QualityPreset) -> Result<CompressionResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(PdfJob { bytes, preset, reply: reply_tx })
            .await
            .map_err(|_| KompaktError::WorkerError("pdf worker is gone".into()))?;
        reply_rx
            .await
            .map_err(|_| KompaktError::WorkerError("pdf worker dropped the job".into()))
    }
}

/// Lazily-initialised owner of the PDF worker.
///
/// The thread is created on the first PDF job and shared by every
/// subsequent one; concurrent first calls race on the cell, not on thread
/// creation.
pub struct PdfWorkerProvider {
    handle: tokio::sync::OnceCell<PdfWorkerHandle>,
}

impl PdfWorkerProvider {
    pub fn new() -> Self {
        Self { handle: tokio::sync::OnceCell::new() }
    }

    pub async fn get_or_create(&self) -> &PdfWorkerHandle {
        self.handle
            .get_or_init(|| async {
                debug!("starting pdf worker");
                PdfWorkerHandle::spawn()
            })
            .await
    }
}

impl Default for PdfWorkerProvider {
    fn default() -> Self {
        Self::new()
    }
}
