//! Matrices in Metal shared memory.

use crate::context::MetalContext;
use spmm_tune::{DenseMatrix, Matrix, OperandDescriptor, Result};

/// A matrix operand stored in a Metal buffer.
pub type GpuMatrix = Matrix<MetalContext>;

/// Upload and download helpers for [`GpuMatrix`].
///
/// Host data is row-major and unpadded; the device copy follows the
/// descriptor's leading dimension, with padding zeroed.
pub trait GpuMatrixExt: Sized {
    /// Allocate a zeroed matrix for `desc`.
    fn alloc(ctx: &MetalContext, desc: OperandDescriptor) -> Result<Self>;

    /// Create a matrix for `desc` filled from row-major host data.
    fn from_host_row_major(
        ctx: &MetalContext,
        desc: OperandDescriptor,
        data: &[f64],
    ) -> Result<Self>;

    /// Copy the matrix back to host in row-major order.
    fn to_host_row_major(&self, ctx: &MetalContext) -> Result<Vec<f64>>;
}

impl GpuMatrixExt for GpuMatrix {
    fn alloc(ctx: &MetalContext, desc: OperandDescriptor) -> Result<Self> {
        let buffer = ctx.alloc_buffer(desc.span_bytes())?;
        Matrix::new(ctx, desc, buffer)
    }

    fn from_host_row_major(
        ctx: &MetalContext,
        desc: OperandDescriptor,
        data: &[f64],
    ) -> Result<Self> {
        let values = DenseMatrix::from_vec(desc.rows, desc.cols, data.to_vec())?;
        let matrix = Self::alloc(ctx, desc)?;
        matrix.set(ctx, &values)?;
        Ok(matrix)
    }

    fn to_host_row_major(&self, ctx: &MetalContext) -> Result<Vec<f64>> {
        Ok(self.get(ctx)?.into_vec())
    }
}
