// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bisection over a single encode parameter (lossy quality or PNG scale).
//
// Both parameters are monotone: a larger value yields a larger output. The
// search keeps a live bracket, halves it each step, and stops early the
// moment an attempt lands inside the target band. When the band is never
// hit the attempt closest to its midpoint wins.

use kompakt_core::error::Result;
use kompakt_core::types::TargetBand;
use tracing::{debug, instrument, trace};

/// One evaluated point of the search.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// The parameter value that was rendered (quality or scale).
    pub param: f64,
    /// Encoded output at that parameter.
    pub bytes: Vec<u8>,
    /// `bytes.len() / input_size`.
    pub keep_ratio: f64,
}

/// Where the search ended up.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The winning attempt.
    pub best: Attempt,
    /// Whether the winner's keep ratio is inside the target band.
    pub in_band: bool,
    /// Total render calls made, seed included.
    pub attempts: u32,
}

/// Drive `render` towards the target band.
///
/// `seed` is evaluated first, then up to `budget` bisection steps refine the
/// bracket. `render` must be monotone non-decreasing in its parameter for
/// the bracket arithmetic to converge; mild non-monotonicity (PNG filter
/// quirks) only costs accuracy, not termination.
///
/// A render failure aborts the whole search; the caller decides whether to
/// fall back to the unchanged input.
#[instrument(skip(render), fields(?band, input_size, seed, budget))]
pub fn run_search<F>(
    band: TargetBand,
    input_size: u64,
    seed: f64,
    bracket: (f64, f64),
    budget: u32,
    mut render: F,
) -> Result<SearchOutcome>
where
    F: FnMut(f64) -> Result<Vec<u8>>,
{
    let (mut lo, mut hi) = bracket;
    let input_size = input_size.max(1) as f64;
    let midpoint = band.midpoint();

    let mut evaluate = |param: f64| -> Result<Attempt> {
        let bytes = render(param)?;
        let keep_ratio = bytes.len() as f64 / input_size;
        trace!(param, keep_ratio, out_len = bytes.len(), "search attempt");
        Ok(Attempt { param, bytes, keep_ratio })
    };

    let mut param = seed.clamp(lo, hi);
    let mut best: Option<Attempt> = None;
    let mut best_distance = f64::INFINITY;
    let mut attempts = 0u32;

    // Seed attempt plus `budget` bisection steps.
    for _ in 0..=budget {
        let attempt = evaluate(param)?;
        attempts += 1;
        let keep_ratio = attempt.keep_ratio;
        let distance = (keep_ratio - midpoint).abs();
        if distance < best_distance {
            best_distance = distance;
            best = Some(attempt);
        }

        if band.contains(keep_ratio) {
            debug!(attempts, param, keep_ratio, "search hit the band");
            // best was just replaced: an in-band ratio is always closer to
            // the midpoint than any out-of-band one.
            break;
        }

        // Output too large: lower the parameter. Too small: raise it.
        if keep_ratio > band.max {
            hi = param;
        } else {
            lo = param;
        }
        param = (lo + hi) / 2.0;
    }

    // `best` is always set: the loop body runs at least once and either
    // returns an error or records an attempt.
    let best = best.ok_or_else(|| {
        kompakt_core::KompaktError::WorkerError("search produced no attempts".into())
    })?;
    let in_band = band.contains(best.keep_ratio);
    debug!(attempts, keep_ratio = best.keep_ratio, in_band, "search finished");
    Ok(SearchOutcome { best, in_band, attempts })
}
