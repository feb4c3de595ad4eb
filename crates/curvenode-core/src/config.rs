//! Evaluation configuration.

use crate::error::CurveError;

/// Default minimum number of elements per parallel batch chunk.
pub const DEFAULT_PARALLEL_GRAIN: usize = 4096;

/// Environment variable overriding [`EvalConfig::parallel_grain`].
pub const PARALLEL_GRAIN_ENV: &str = "CURVENODE_PARALLEL_GRAIN";

/// Runtime knobs for the batch evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Masks shorter than this run on the calling thread; longer masks are
    /// split across the rayon pool in chunks of at least this many indices.
    pub parallel_grain: usize,
}

impl EvalConfig {
    pub fn with_parallel_grain(parallel_grain: usize) -> Self {
        Self {
            parallel_grain: parallel_grain.max(1),
        }
    }

    /// Read the configuration from the environment, rejecting malformed
    /// values instead of falling back.
    pub fn from_env() -> Result<Self, CurveError> {
        match std::env::var(PARALLEL_GRAIN_ENV) {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(grain) if grain > 0 => Ok(Self::with_parallel_grain(grain)),
                _ => Err(CurveError::Config {
                    key: PARALLEL_GRAIN_ENV,
                    value,
                }),
            },
            Err(_) => Ok(Self::with_parallel_grain(DEFAULT_PARALLEL_GRAIN)),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::with_parallel_grain(
            std::env::var(PARALLEL_GRAIN_ENV)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_PARALLEL_GRAIN),
        )
    }
}
