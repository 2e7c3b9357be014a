//! Kernel selection: structural keys, benchmarking and the kernel cache.
//!
//! # Autotuning Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ key = (a.id, alpha, beta, alignment, ldb, ldc)                │
//! │ cache hit?  ──yes──▶ reuse entry                              │
//! │     │ no                                                      │
//! │ snapshot out's backing buffer                                 │
//! │ for i in 0..max_candidates:                                   │
//! │   candidate = generator.next(feedback)   (None → stop)        │
//! │   kernel    = compile(candidate.source)  (error → skip)       │
//! │   runtime   = benchmark(kernel, b, out)  (error → skip)       │
//! │   keep if runtime < best.runtime                              │
//! │   feedback  = runtime                                         │
//! │ restore out's backing buffer                                  │
//! │ store best (none → build failure, nothing stored)             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Contents
//!
//! - [`key`](key): [`StructuralKey`] and alignment granularity
//! - [`bench`](bench): [`Benchmarker`]
//! - [`autotune`](autotune): the candidate loop ([`Autotuner`])
//! - [`cache`](cache): [`KernelCache`] with single-flight builds per key
//! - [`stats`](stats): hit/miss/build counters

mod autotune;
mod bench;
mod cache;
mod key;
mod stats;

pub use autotune::{kernel_name, Autotuner};
pub use bench::Benchmarker;
pub use cache::{CacheEntry, KernelCache};
pub use key::{alignment_granularity, StructuralKey};
pub use stats::{CacheStats, StatsSnapshot};
