//! Eligibility checks for the autotuned sparse path.

use crate::backend::Backend;
use crate::error::{Result, SpmmError};
use crate::types::{DenseMatrix, Matrix, OperandDescriptor};

/// Check that `out = a * b` is dimensionally valid and that all three
/// operands share one element type.
pub fn check_dimensions(
    a: &OperandDescriptor,
    b: &OperandDescriptor,
    out: &OperandDescriptor,
) -> Result<()> {
    if a.rows != out.rows || a.cols != b.rows || b.cols != out.cols {
        return Err(SpmmError::InvalidUsage(format!(
            "a is {}x{}, b is {}x{}, out is {}x{}",
            a.rows, a.cols, b.rows, b.cols, out.rows, out.cols
        )));
    }
    if a.dtype != b.dtype || b.dtype != out.dtype {
        return Err(SpmmError::InvalidUsage(format!(
            "element types differ: a is {}, b is {}, out is {}",
            a.dtype, b.dtype, out.dtype
        )));
    }
    Ok(())
}

/// Run the gate and return the dense values of `a` on success.
///
/// Checks run in order and the first failure wins: dimensions
/// ([`SpmmError::InvalidUsage`]), the `const` tag on `a`, then the non-zero
/// ceiling (both [`SpmmError::NotSuitable`]). The values of `a` are only
/// read once the cheap checks pass.
pub fn check_suitable<B: Backend>(
    backend: &B,
    a: &Matrix<B>,
    b: &Matrix<B>,
    out: &Matrix<B>,
    max_nnz: usize,
) -> Result<DenseMatrix> {
    check_dimensions(a.descriptor(), b.descriptor(), out.descriptor())?;

    if !a.tags().is_const() {
        return Err(SpmmError::NotSuitable(format!(
            "{} is not tagged const",
            a.id()
        )));
    }

    let dense = a.get(backend)?;
    let nnz = dense.count_nonzero();
    if nnz > max_nnz {
        return Err(SpmmError::NotSuitable(format!(
            "{} has {nnz} non-zeros, limit is {max_nnz}",
            a.id()
        )));
    }

    Ok(dense)
}
