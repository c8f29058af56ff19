// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kompakt-engine — Feedback-controlled compression for raster images and
// PDFs.
//
// The engine re-encodes a source at varying quality/scale parameters until
// the output lands inside the preset's target keep-ratio band. The search
// runs on a background worker by default and falls back to an identical
// inline pass when the worker fails or barely improves on the input.

pub mod engine;
pub mod pdf;
pub mod pipeline;
pub mod search;
pub mod strategy;
pub mod worker;

pub use engine::CompressionEngine;
pub use pdf::PdfCompressor;
pub use search::{Attempt, SearchOutcome, run_search};
pub use strategy::{InlineSearchStrategy, SearchStrategy, WorkerSearchStrategy};
pub use worker::{CompressReply, CompressRequest, PdfWorkerProvider};
