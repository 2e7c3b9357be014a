//! Reference generator emitting fully unrolled MSL kernels.
//!
//! Each thread owns one column `j` of `out` and evaluates every row of
//! `alpha * a` as a straight-line sum over that row's non-zeros, with the
//! coefficients baked in as exact bit patterns. Candidates share one source
//! and differ in threadgroup width.

use spmm_tune::{
    Candidate, CandidateGenerator, DType, Feedback, GenerationRequest, KernelGenerator,
    LaunchGeometry,
};
use std::fmt::{self, Write};
use std::time::Duration;

/// Threadgroup widths tried by default, narrowest first.
pub const DEFAULT_GROUP_WIDTHS: [u64; 4] = [32, 64, 128, 256];

/// Generator for `f32` operands. Other dtypes yield no candidates.
#[derive(Debug, Clone)]
pub struct UnrolledMsl {
    widths: Vec<u64>,
}

impl Default for UnrolledMsl {
    fn default() -> Self {
        Self::new()
    }
}

impl UnrolledMsl {
    pub fn new() -> Self {
        Self {
            widths: DEFAULT_GROUP_WIDTHS.to_vec(),
        }
    }
}

impl KernelGenerator for UnrolledMsl {
    type Generator = UnrolledCandidates;

    fn kernels(&self, request: GenerationRequest) -> UnrolledCandidates {
        let source = match request.dtype {
            DType::F32 => emit_source(&request).ok(),
            DType::F64 => None,
        };
        if source.is_none() {
            log::debug!("{}: no MSL kernel for {}", request.name, request.dtype);
        }
        UnrolledCandidates {
            source,
            widths: self.widths.clone(),
            columns: request.n as u64,
            next: 0,
            best: None,
        }
    }
}

/// Candidates for one request, widening the threadgroup until it stops helping.
pub struct UnrolledCandidates {
    source: Option<String>,
    widths: Vec<u64>,
    columns: u64,
    next: usize,
    best: Option<Duration>,
}

impl CandidateGenerator for UnrolledCandidates {
    fn next(&mut self, feedback: Option<&Feedback>) -> Option<Candidate> {
        let source = self.source.as_ref()?;
        if let Some(feedback) = feedback {
            if self.best.is_some_and(|best| feedback.runtime > best) {
                return None;
            }
            self.best = Some(feedback.runtime);
        }

        let width = *self.widths.get(self.next)?;
        self.next += 1;
        let groups = self.columns.div_ceil(width).max(1);
        Some(Candidate::new(
            source.clone(),
            LaunchGeometry::linear(groups, width),
        ))
    }
}

/// Exact `f32` literal for a coefficient.
fn float_literal(value: f64) -> String {
    format!("as_type<float>(0x{:08x}u)", (value as f32).to_bits())
}

fn emit_source(req: &GenerationRequest) -> Result<String, fmt::Error> {
    let mut src = String::new();
    writeln!(src, "#include <metal_stdlib>")?;
    writeln!(src, "using namespace metal;")?;
    writeln!(src)?;
    writeln!(src, "kernel void {}(", req.name)?;
    writeln!(src, "    device const float* b [[buffer(0)]],")?;
    writeln!(src, "    device float* out [[buffer(1)]],")?;
    writeln!(src, "    uint j [[thread_position_in_grid]])")?;
    writeln!(src, "{{")?;
    writeln!(src, "    if (j >= {}u) return;", req.n)?;

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); req.a.rows()];
    for (i, k, value) in req.a.nonzeros() {
        rows[i].push(format!("{} * b[{}u + j]", float_literal(value), k * req.ldb));
    }

    for (i, terms) in rows.iter().enumerate() {
        let target = format!("out[{}u + j]", i * req.ldc);
        let mut expr = if terms.is_empty() {
            "0.0f".to_string()
        } else {
            terms.join(" + ")
        };
        if req.beta != 0.0 {
            write!(expr, " + {} * {target}", float_literal(req.beta))?;
        }
        writeln!(src, "    {target} = {expr};")?;
    }

    writeln!(src, "}}")?;
    Ok(src)
}
