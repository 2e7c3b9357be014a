use super::{Benchmarker, CacheEntry, CacheStats, StructuralKey};
use crate::backend::{Backend, KernelParam};
use crate::config::AutotuneConfig;
use crate::error::{Result, SpmmError};
use crate::generator::{CandidateGenerator, Feedback, GenerationRequest, KernelGenerator};
use crate::types::{DType, DenseMatrix, Matrix};

/// Parameters of every generated kernel: `b` then `out`.
const KERNEL_PARAMS: [KernelParam; 2] = [KernelParam::DevicePtr, KernelParam::DevicePtr];

/// Entry-point name for kernels multiplying by a `rows`×`cols` constant.
pub fn kernel_name(rows: usize, cols: usize) -> String {
    format!("spmm_{rows}x{cols}")
}

/// Runs the generate → compile → benchmark loop for one structural key.
pub struct Autotuner<'a, B: Backend> {
    backend: &'a B,
    config: &'a AutotuneConfig,
    stats: &'a CacheStats,
}

/// Writes a snapshot of `out`'s backing buffer back when dropped.
struct RestoreOnDrop<'g, B: Backend> {
    backend: &'g B,
    out: &'g Matrix<B>,
    snapshot: Option<Vec<u8>>,
}

impl<B: Backend> RestoreOnDrop<'_, B> {
    fn restore(mut self) -> Result<()> {
        match self.snapshot.take() {
            Some(bytes) => self.out.restore(self.backend, &bytes),
            None => Ok(()),
        }
    }
}

impl<B: Backend> Drop for RestoreOnDrop<'_, B> {
    fn drop(&mut self) {
        // only reached with a snapshot left when unwinding
        if let Some(bytes) = self.snapshot.take() {
            if let Err(e) = self.out.restore(self.backend, &bytes) {
                log::warn!("failed to restore {} after aborted autotune: {e}", self.out.id());
            }
        }
    }
}

struct Outcome<K> {
    best: Option<CacheEntry<K>>,
    attempted: usize,
    last_error: Option<String>,
}

impl<'a, B: Backend> Autotuner<'a, B> {
    pub fn new(backend: &'a B, config: &'a AutotuneConfig, stats: &'a CacheStats) -> Self {
        Self {
            backend,
            config,
            stats,
        }
    }

    /// Find the fastest candidate for `out = alpha * a * b + beta * out`.
    ///
    /// `a` holds the unscaled values of the constant operand; scale factors
    /// come from `key`. The backing buffer of `out` is restored before
    /// returning, whether or not a candidate was found, and also when a
    /// generator or backend callback panics.
    pub fn run<G: KernelGenerator>(
        &self,
        generator: &G,
        key: &StructuralKey,
        a: &DenseMatrix,
        dtype: DType,
        b: &Matrix<B>,
        out: &Matrix<B>,
    ) -> Result<CacheEntry<B::Kernel>> {
        let name = kernel_name(a.rows(), a.cols());
        let saved = RestoreOnDrop {
            backend: self.backend,
            out,
            snapshot: Some(out.snapshot(self.backend)?),
        };

        let request = GenerationRequest {
            name: name.clone(),
            dtype,
            a: a.scaled(key.alpha()),
            beta: key.beta(),
            alignment: key.alignment(),
            n: b.cols(),
            ldb: key.ldb(),
            ldc: key.ldc(),
        };
        let mut candidates = generator.kernels(request);
        let outcome = self.evaluate(&mut candidates, &name, b, out);

        saved.restore()?;

        match outcome.best {
            Some(best) => {
                log::info!(
                    "autotuned {name} for {key}: {} candidate(s), best {:?} at {}",
                    outcome.attempted,
                    best.runtime,
                    best.geometry
                );
                Ok(best)
            }
            None => Err(SpmmError::BuildFailed {
                key: *key,
                attempted: outcome.attempted,
                last_error: outcome.last_error,
            }),
        }
    }

    fn evaluate<C: CandidateGenerator>(
        &self,
        candidates: &mut C,
        name: &str,
        b: &Matrix<B>,
        out: &Matrix<B>,
    ) -> Outcome<B::Kernel> {
        let bench = Benchmarker::from_config(self.config);
        let args = [b.device_ptr(), out.device_ptr()];
        let mut outcome = Outcome {
            best: None,
            attempted: 0,
            last_error: None,
        };
        let mut feedback: Option<Feedback> = None;

        for i in 0..self.config.candidate_limit() {
            log::trace!("{name}: requesting candidate {i} with feedback {feedback:?}");
            let Some(candidate) = candidates.next(feedback.as_ref()) else {
                log::debug!("{name}: generator exhausted after {i} candidate(s)");
                break;
            };
            outcome.attempted += 1;
            feedback = None;

            let kernel = match self.backend.compile(name, &candidate.source, &KERNEL_PARAMS) {
                Ok(kernel) => kernel,
                Err(e) => {
                    log::warn!("{name}: skipping candidate {i}, compile failed: {e}");
                    self.stats.inc_skipped();
                    outcome.last_error = Some(e.to_string());
                    continue;
                }
            };

            let geometry = candidate.geometry;
            let measured = bench.measure(self.backend, |queue| {
                self.backend.launch(queue, &kernel, &geometry, &args)
            });
            let runtime = match measured {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::warn!("{name}: skipping candidate {i}, launch failed: {e}");
                    self.stats.inc_skipped();
                    outcome.last_error = Some(e.to_string());
                    continue;
                }
            };

            self.stats.inc_benchmarked();
            log::debug!("{name}: candidate {i} at {geometry} took {runtime:?}");

            let improves = outcome
                .best
                .as_ref()
                .map_or(true, |best| runtime < best.runtime);
            if improves {
                outcome.best = Some(CacheEntry {
                    name: name.to_string(),
                    kernel,
                    geometry,
                    runtime,
                });
            }
            feedback = Some(Feedback { runtime });
        }

        outcome
    }
}
