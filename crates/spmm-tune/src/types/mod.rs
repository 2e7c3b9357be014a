//! Operand model for autotuned sparse multiplication.
//!
//! The multiply `out = alpha * a * b + beta * out` involves three operands.
//! The first, `a`, is *constant*: its values are fixed for the lifetime of
//! the logical matrix, so a kernel may embed its sparsity pattern and
//! non-zero values directly into the generated source. The other two are
//! ordinary device matrices whose values change between invocations.
//!
//! # Layout
//!
//! All matrices are row-major with an explicit leading dimension:
//!
//! ```text
//! element (i, j) lives at byte  offset + (i * leaddim + j) * item_size
//! ```
//!
//! # Tags
//!
//! | Tag | Meaning | Effect |
//! |-----|---------|--------|
//! | [`Tags::CONST`] | values never change | required on `a` |
//! | [`Tags::ALIGN`] | rows start on device-aligned boundaries | enables aligned kernels when set on both `b` and `out` |
//!
//! # Storage
//!
//! A [`Matrix`] either owns a device buffer directly or is a sub-view of
//! another matrix. Snapshot/restore always targets the owning root, see
//! [`Matrix::backing`].

mod dense;
mod descriptor;
mod dtype;
mod matrix;

pub use dense::DenseMatrix;
pub use descriptor::{OperandDescriptor, OperandId, Tags};
pub use dtype::DType;
pub use matrix::{Matrix, OperandKind};
