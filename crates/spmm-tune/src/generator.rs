//! Candidate-generator protocol.
//!
//! A generator is an externally driven state object. The autotuning loop
//! polls it with [`CandidateGenerator::next`], passing the measured runtime
//! of the previous candidate so the generator can steer later proposals.
//! Returning `None` means the generator is exhausted, which ends the loop
//! normally.

use crate::backend::LaunchGeometry;
use crate::types::{DType, DenseMatrix};
use std::time::Duration;

/// One proposed kernel implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: String,
    pub geometry: LaunchGeometry,
}

impl Candidate {
    pub fn new(source: impl Into<String>, geometry: LaunchGeometry) -> Self {
        Self {
            source: source.into(),
            geometry,
        }
    }
}

/// Measurement of the previously proposed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub runtime: Duration,
}

/// Everything a generator needs to emit kernels for one structural key.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Entry-point name the emitted source must define.
    pub name: String,
    pub dtype: DType,
    /// Values of `a`, already multiplied by `alpha`.
    pub a: DenseMatrix,
    pub beta: f64,
    /// Alignment granularity in elements, if `b` and `out` are aligned.
    pub alignment: Option<usize>,
    /// Column count of `b` and `out`.
    pub n: usize,
    pub ldb: usize,
    pub ldc: usize,
}

/// Lazily proposes candidates for one request.
pub trait CandidateGenerator {
    /// The next candidate, or `None` once exhausted.
    fn next(&mut self, feedback: Option<&Feedback>) -> Option<Candidate>;
}

impl<F> CandidateGenerator for F
where
    F: FnMut(Option<&Feedback>) -> Option<Candidate>,
{
    fn next(&mut self, feedback: Option<&Feedback>) -> Option<Candidate> {
        self(feedback)
    }
}

/// Source of candidate generators, one per autotuning run.
pub trait KernelGenerator {
    type Generator: CandidateGenerator;

    fn kernels(&self, request: GenerationRequest) -> Self::Generator;
}
