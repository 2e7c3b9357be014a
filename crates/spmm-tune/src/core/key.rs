use crate::types::{OperandDescriptor, OperandId};
use std::fmt;

/// Cache identity of a sparse multiply.
///
/// Captures every parameter that changes the generated source or launch
/// geometry. Scale factors compare by exact bit pattern, so `0.0` and `-0.0`
/// are distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralKey {
    a: OperandId,
    alpha: u64,
    beta: u64,
    alignment: Option<usize>,
    ldb: usize,
    ldc: usize,
}

impl StructuralKey {
    pub fn new(
        a: OperandId,
        alpha: f64,
        beta: f64,
        alignment: Option<usize>,
        ldb: usize,
        ldc: usize,
    ) -> Self {
        Self {
            a,
            alpha: alpha.to_bits(),
            beta: beta.to_bits(),
            alignment,
            ldb,
            ldc,
        }
    }

    /// Key for `out = alpha * a * b + beta * out` on a device with the given
    /// alignment.
    pub fn for_operands(
        a: &OperandDescriptor,
        b: &OperandDescriptor,
        out: &OperandDescriptor,
        alpha: f64,
        beta: f64,
        alignment_bytes: usize,
    ) -> Self {
        Self::new(
            a.id,
            alpha,
            beta,
            alignment_granularity(b, out, alignment_bytes),
            b.leaddim,
            out.leaddim,
        )
    }

    pub fn operand(&self) -> OperandId {
        self.a
    }

    pub fn alpha(&self) -> f64 {
        f64::from_bits(self.alpha)
    }

    pub fn beta(&self) -> f64 {
        f64::from_bits(self.beta)
    }

    pub fn alignment(&self) -> Option<usize> {
        self.alignment
    }

    pub fn ldb(&self) -> usize {
        self.ldb
    }

    pub fn ldc(&self) -> usize {
        self.ldc
    }
}

impl fmt::Display for StructuralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(a={}, alpha={}, beta={}, align=",
            self.a,
            self.alpha(),
            self.beta()
        )?;
        match self.alignment {
            Some(n) => write!(f, "{n}")?,
            None => f.write_str("none")?,
        }
        write!(f, ", ldb={}, ldc={})", self.ldb, self.ldc)
    }
}

/// Alignment in elements when both `b` and `out` are tagged `align`.
pub fn alignment_granularity(
    b: &OperandDescriptor,
    out: &OperandDescriptor,
    alignment_bytes: usize,
) -> Option<usize> {
    if b.tags.is_aligned() && out.tags.is_aligned() {
        Some(alignment_bytes / b.item_size())
    } else {
        None
    }
}
