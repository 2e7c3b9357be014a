//! Autotuned kernel selection for sparse-constant matrix multiplication.
//!
//! Computes `out = alpha * a * b + beta * out` where `a` is a small, sparse
//! matrix whose contents never change (tagged `const`). Instead of a generic
//! sparse routine, a pluggable generator emits kernels specialized to the
//! values of `a`; each candidate is compiled and benchmarked on the device,
//! and the fastest is cached under a structural key so later multiplies with
//! the same structure skip the search.
//!
//! # Quick Start
//!
//! ```ignore
//! use spmm_tune::{SparseMatMul, Tags};
//!
//! let mm = SparseMatMul::new(&ctx, generator);
//!
//! // a: 8×8 constant operand with few nonzeros
//! let bound = mm.mul_scaled(&a, &b, &out, 2.0, 0.0)?;
//! bound.run()?;
//!
//! // Same key: served from the cache, no generation or benchmarking.
//! mm.mul_scaled(&a, &b, &out, 2.0, 0.0)?.run()?;
//! ```
//!
//! # Structural Key
//!
//! | Field       | Source                                              |
//! |-------------|-----------------------------------------------------|
//! | `a`         | identity of the constant operand                    |
//! | `alpha`     | scale factor (exact bit pattern)                    |
//! | `beta`      | accumulate factor (exact bit pattern)               |
//! | `alignment` | elements per row alignment, when `b` and `out` align |
//! | `ldb`/`ldc` | leading dimensions of `b` and `out`                 |
//!
//! # Backends
//!
//! Device access goes through the [`Backend`] trait. The
//! `spmm-tune-metal` crate provides a Metal implementation.

mod api;
mod backend;
mod config;
pub mod core;
mod error;
mod generator;
mod suitability;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{BoundMatMul, SparseMatMul};
pub use backend::{Backend, DevicePtr, KernelParam, LaunchGeometry};
pub use config::{
    AutotuneConfig, DEFAULT_BENCH_RUNS, DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_NNZ,
    DEFAULT_WARMUP_RUNS,
};
pub use crate::core::{
    alignment_granularity, kernel_name, Benchmarker, CacheEntry, CacheStats, KernelCache,
    StatsSnapshot, StructuralKey,
};
pub use error::{DeviceError, Result, SpmmError};
pub use generator::{Candidate, CandidateGenerator, Feedback, GenerationRequest, KernelGenerator};
pub use suitability::{check_dimensions, check_suitable};
pub use types::{DType, DenseMatrix, Matrix, OperandDescriptor, OperandId, OperandKind, Tags};
