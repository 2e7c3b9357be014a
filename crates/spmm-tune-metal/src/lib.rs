//! Metal backend for autotuned sparse-constant matrix multiplication.
//!
//! [`MetalContext`] implements [`spmm_tune::Backend`]: candidate kernels are
//! compiled from MSL source at runtime and dispatched on the context's
//! command queue.
//!
//! # Quick Start
//!
//! ```ignore
//! use spmm_tune::{OperandDescriptor, DType, Tags};
//! use spmm_tune_metal::{global_matmul, global_context, GpuMatrix, GpuMatrixExt, UnrolledMsl};
//!
//! let ctx = global_context()?;
//! let mm = global_matmul(UnrolledMsl::new())?;
//!
//! let a_desc = OperandDescriptor::new(m, k, DType::F32).with_tag(Tags::CONST);
//! let a = GpuMatrix::from_host_row_major(ctx, a_desc, &a_host)?;
//! let b = GpuMatrix::from_host_row_major(ctx, OperandDescriptor::new(k, n, DType::F32), &b_host)?;
//! let out = GpuMatrix::alloc(ctx, OperandDescriptor::new(m, n, DType::F32))?;
//!
//! mm.mul(&a, &b, &out)?.run()?;
//! let c = out.to_host_row_major(ctx)?;
//! ```
//!
//! # Performance
//!
//! The global context and kernel cache persist for the process lifetime, so
//! a structural key is autotuned at most once no matter how many
//! [`SparseMatMul`] instances use them.

#![cfg(target_os = "macos")]

mod context;
mod error;
mod gpu_mat;
mod kernels;
mod msl;

use once_cell::sync::OnceCell;
use spmm_tune::{AutotuneConfig, KernelCache, KernelGenerator, SparseMatMul};
use std::sync::Arc;

pub use context::{MetalContext, ALIGNMENT_BYTES};
pub use error::{MetalError, Result};
pub use gpu_mat::{GpuMatrix, GpuMatrixExt};
pub use kernels::MetalKernel;
pub use msl::{UnrolledCandidates, UnrolledMsl, DEFAULT_GROUP_WIDTHS};

static GLOBAL_CONTEXT: OnceCell<MetalContext> = OnceCell::new();
static GLOBAL_KERNEL_CACHE: OnceCell<Arc<KernelCache<MetalKernel>>> = OnceCell::new();

/// Get or initialize the process-wide Metal context.
///
/// # Errors
///
/// Returns an error if Metal initialization fails (no device, etc.)
pub fn global_context() -> Result<&'static MetalContext> {
    GLOBAL_CONTEXT.get_or_try_init(MetalContext::new)
}

/// Kernel cache shared by every multiplier on the global context.
pub fn global_kernel_cache() -> Arc<KernelCache<MetalKernel>> {
    Arc::clone(GLOBAL_KERNEL_CACHE.get_or_init(|| Arc::new(KernelCache::new())))
}

/// A multiplier on the global context and cache, configured from the
/// environment.
pub fn global_matmul<G: KernelGenerator>(
    generator: G,
) -> Result<SparseMatMul<'static, MetalContext, G>> {
    let ctx = global_context()?;
    Ok(SparseMatMul::new(ctx, generator)
        .with_config(AutotuneConfig::from_env())
        .with_cache(global_kernel_cache()))
}
