// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

use crate::types::{
    BINARY_SEARCH_ITERATIONS, MIN_BYTES, OutputFormat, QualityPreset, WORKER_IMPROVEMENT_EPSILON,
};

/// Tunable engine settings.
///
/// The defaults match the constants the search was designed around; none of
/// the numeric values are load-bearing beyond tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Files below this size skip the search entirely.
    pub min_bytes: u64,
    /// Maximum bisection steps after the seed attempt.
    pub iteration_budget: u32,
    /// Worker keep-ratio at or above this fraction triggers the inline
    /// fallback.
    pub worker_improvement_epsilon: f64,
    /// Preset used when the caller does not specify one.
    pub default_preset: QualityPreset,
    /// Output format used when the caller does not specify one.
    pub default_format: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bytes: MIN_BYTES,
            iteration_budget: BINARY_SEARCH_ITERATIONS,
            worker_improvement_epsilon: WORKER_IMPROVEMENT_EPSILON,
            default_preset: QualityPreset::Medium,
            default_format: OutputFormat::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.min_bytes, config.min_bytes);
        assert_eq!(back.iteration_budget, config.iteration_budget);
        assert_eq!(back.default_preset, QualityPreset::Medium);
    }

    #[test]
    fn presets_serialise_lowercase() {
        let json = serde_json::to_string(&QualityPreset::Low).unwrap();
        assert_eq!(json, "\"low\"");
    }
}
