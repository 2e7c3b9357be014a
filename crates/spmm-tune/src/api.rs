use crate::backend::{Backend, LaunchGeometry};
use crate::config::AutotuneConfig;
use crate::core::{Autotuner, CacheEntry, KernelCache, StructuralKey};
use crate::error::{Result, SpmmError};
use crate::generator::KernelGenerator;
use crate::suitability::check_suitable;
use crate::types::Matrix;
use std::sync::Arc;
use std::time::Duration;

/// Autotuned `out = alpha * a * b + beta * out` for a constant sparse `a`.
///
/// The first call for a given [`StructuralKey`] generates and benchmarks
/// candidate kernels on the device; later calls reuse the fastest one.
///
/// # Example
///
/// ```ignore
/// use spmm_tune::{AutotuneConfig, SparseMatMul};
///
/// let mm = SparseMatMul::new(&ctx, generator).with_config(AutotuneConfig::from_env());
///
/// match mm.mul(&a, &b, &out) {
///     Ok(kernel) => kernel.run()?,
///     Err(e) if e.is_not_suitable() => dense_fallback(&a, &b, &out)?,
///     Err(e) => return Err(e.into()),
/// }
/// ```
pub struct SparseMatMul<'a, B: Backend, G> {
    backend: &'a B,
    generator: G,
    config: AutotuneConfig,
    cache: Arc<KernelCache<B::Kernel>>,
}

impl<'a, B: Backend, G: KernelGenerator> SparseMatMul<'a, B, G> {
    /// Create a multiplier with its own cache and default limits.
    pub fn new(backend: &'a B, generator: G) -> Self {
        Self {
            backend,
            generator,
            config: AutotuneConfig::default(),
            cache: Arc::new(KernelCache::new()),
        }
    }

    pub fn with_config(mut self, config: AutotuneConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a kernel cache with other multipliers on the same device.
    pub fn with_cache(mut self, cache: Arc<KernelCache<B::Kernel>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &AutotuneConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<KernelCache<B::Kernel>> {
        &self.cache
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// `out = a * b`.
    pub fn mul<'m>(
        &self,
        a: &Matrix<B>,
        b: &'m Matrix<B>,
        out: &'m Matrix<B>,
    ) -> Result<BoundMatMul<'m, B>>
    where
        'a: 'm,
    {
        self.mul_scaled(a, b, out, 1.0, 0.0)
    }

    /// `out = alpha * a * b + beta * out`.
    ///
    /// Returns [`SpmmError::NotSuitable`] when `a` is not constant or too
    /// dense, [`SpmmError::InvalidUsage`] on a shape mismatch, and
    /// [`SpmmError::BuildFailed`] when no candidate could be benchmarked.
    /// `out` holds its original contents when this returns; the multiply
    /// itself happens on [`BoundMatMul::execute`].
    pub fn mul_scaled<'m>(
        &self,
        a: &Matrix<B>,
        b: &'m Matrix<B>,
        out: &'m Matrix<B>,
        alpha: f64,
        beta: f64,
    ) -> Result<BoundMatMul<'m, B>>
    where
        'a: 'm,
    {
        let dense = check_suitable(self.backend, a, b, out, self.config.max_nnz)?;

        let key = StructuralKey::for_operands(
            a.descriptor(),
            b.descriptor(),
            out.descriptor(),
            alpha,
            beta,
            self.backend.alignment_bytes(),
        );

        let entry = self.cache.get_or_build(&key, || {
            Autotuner::new(self.backend, &self.config, self.cache.stats()).run(
                &self.generator,
                &key,
                &dense,
                a.dtype(),
                b,
                out,
            )
        })?;

        Ok(BoundMatMul {
            backend: self.backend,
            entry,
            b,
            out,
        })
    }
}

/// A selected kernel bound to the `b` and `out` it was selected for.
///
/// Re-running performs no validation or cache lookup. Binding different
/// operands requires a new call to [`SparseMatMul::mul_scaled`].
pub struct BoundMatMul<'m, B: Backend> {
    backend: &'m B,
    entry: Arc<CacheEntry<B::Kernel>>,
    b: &'m Matrix<B>,
    out: &'m Matrix<B>,
}

impl<'m, B: Backend> BoundMatMul<'m, B> {
    /// Launch the kernel on `queue` against the bound operands.
    pub fn execute(&self, queue: &B::Queue) -> Result<()> {
        let args = [self.b.device_ptr(), self.out.device_ptr()];
        self.backend
            .launch(queue, &self.entry.kernel, &self.entry.geometry, &args)
            .map_err(SpmmError::device)
    }

    /// Launch on the backend's default queue.
    pub fn run(&self) -> Result<()> {
        self.execute(self.backend.queue())
    }

    /// Runtime measured for this kernel during autotuning.
    pub fn runtime(&self) -> Duration {
        self.entry.runtime
    }

    pub fn geometry(&self) -> &LaunchGeometry {
        &self.entry.geometry
    }

    pub fn kernel_name(&self) -> &str {
        &self.entry.name
    }

    /// The operands the kernel reads and writes: `[b, out]`.
    pub fn operands(&self) -> [&'m Matrix<B>; 2] {
        [self.b, self.out]
    }
}
