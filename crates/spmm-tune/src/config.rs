//! Autotuning limits.

use serde::{Deserialize, Serialize};

/// Default ceiling on the non-zero count of the constant operand.
pub const DEFAULT_MAX_NNZ: usize = 2048;
/// Default number of candidate kernels to benchmark per key.
pub const DEFAULT_MAX_CANDIDATES: usize = 18;
/// Default number of timed runs per candidate.
pub const DEFAULT_BENCH_RUNS: usize = 40;
/// Default number of untimed runs before timing starts.
pub const DEFAULT_WARMUP_RUNS: usize = 1;

/// Limits that bound suitability and total autotuning latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotuneConfig {
    /// Maximum number of non-zeros in `a` for the operation to be suitable.
    pub max_nnz: usize,
    /// Maximum number of candidates to evaluate per structural key.
    pub max_candidates: usize,
    /// Timed launches per candidate.
    pub bench_runs: usize,
    /// Untimed launches per candidate before timing.
    pub warmup_runs: usize,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            max_nnz: DEFAULT_MAX_NNZ,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            bench_runs: DEFAULT_BENCH_RUNS,
            warmup_runs: DEFAULT_WARMUP_RUNS,
        }
    }
}

impl AutotuneConfig {
    /// Build a config from the defaults overridden by environment variables.
    ///
    /// Recognised: `SPMM_TUNE_MAX_NNZ`, `SPMM_TUNE_MAX_CANDIDATES`,
    /// `SPMM_TUNE_BENCH_RUNS`, `SPMM_TUNE_WARMUP_RUNS`. Values that fail to
    /// parse are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_nnz: env_usize("SPMM_TUNE_MAX_NNZ", true).unwrap_or(defaults.max_nnz),
            max_candidates: env_usize("SPMM_TUNE_MAX_CANDIDATES", false)
                .unwrap_or(defaults.max_candidates),
            bench_runs: env_usize("SPMM_TUNE_BENCH_RUNS", false).unwrap_or(defaults.bench_runs),
            warmup_runs: env_usize("SPMM_TUNE_WARMUP_RUNS", true)
                .unwrap_or(defaults.warmup_runs),
        }
    }

    pub fn with_max_nnz(mut self, max_nnz: usize) -> Self {
        self.max_nnz = max_nnz;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    pub fn with_runs(mut self, warmup_runs: usize, bench_runs: usize) -> Self {
        self.warmup_runs = warmup_runs;
        self.bench_runs = bench_runs.max(1);
        self
    }

    /// Candidate ceiling, never below one.
    pub fn candidate_limit(&self) -> usize {
        self.max_candidates.max(1)
    }

    /// Timed runs per candidate, never below one.
    pub fn timed_runs(&self) -> usize {
        self.bench_runs.max(1)
    }
}

fn env_usize(var: &str, allow_zero: bool) -> Option<usize> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(0) if !allow_zero => None,
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {var}={raw:?}: not an unsigned integer");
            None
        }
    }
}
