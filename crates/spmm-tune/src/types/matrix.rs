use super::{DType, DenseMatrix, OperandDescriptor, OperandId, Tags};
use crate::backend::{Backend, DevicePtr};
use crate::error::{Result, SpmmError};
use std::sync::Arc;

enum Storage<B: Backend> {
    Direct(B::Buffer),
    SubViewOf { owner: Arc<Matrix<B>>, offset: usize },
}

/// How a matrix relates to the buffer that holds its data.
pub enum OperandKind<'a, B: Backend> {
    /// The matrix owns its buffer.
    Direct,
    /// The matrix is a window into another matrix.
    SubViewOf(&'a Matrix<B>),
}

/// A matrix operand living in device memory.
pub struct Matrix<B: Backend> {
    desc: OperandDescriptor,
    storage: Storage<B>,
}

impl<B: Backend> Matrix<B> {
    /// Wrap a device buffer that holds the matrix described by `desc`.
    pub fn new(backend: &B, desc: OperandDescriptor, buffer: B::Buffer) -> Result<Self> {
        if desc.leaddim < desc.cols {
            return Err(SpmmError::Layout(format!(
                "leading dimension {} is smaller than column count {}",
                desc.leaddim, desc.cols
            )));
        }
        let len = backend.buffer_len(&buffer);
        if len < desc.span_bytes() {
            return Err(SpmmError::Layout(format!(
                "{}: buffer holds {} bytes, layout needs {}",
                desc.id,
                len,
                desc.span_bytes()
            )));
        }
        Ok(Self {
            desc,
            storage: Storage::Direct(buffer),
        })
    }

    /// A `rows`×`cols` window of `owner` starting at (`row`, `col`).
    ///
    /// The view shares the owner's leading dimension, dtype and tags and
    /// gets its own identity.
    pub fn sub_view(
        owner: &Arc<Matrix<B>>,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        let parent = &owner.desc;
        if row + rows > parent.rows || col + cols > parent.cols {
            return Err(SpmmError::Layout(format!(
                "view ({row}, {col}) {rows}x{cols} exceeds {}x{} matrix {}",
                parent.rows, parent.cols, parent.id
            )));
        }
        let desc = OperandDescriptor {
            id: OperandId::fresh(),
            rows,
            cols,
            leaddim: parent.leaddim,
            dtype: parent.dtype,
            tags: parent.tags.clone(),
        };
        let offset = (row * parent.leaddim + col) * parent.item_size();
        Ok(Self {
            desc,
            storage: Storage::SubViewOf {
                owner: Arc::clone(owner),
                offset,
            },
        })
    }

    pub fn descriptor(&self) -> &OperandDescriptor {
        &self.desc
    }

    pub fn id(&self) -> OperandId {
        self.desc.id
    }

    pub fn rows(&self) -> usize {
        self.desc.rows
    }

    pub fn cols(&self) -> usize {
        self.desc.cols
    }

    pub fn leaddim(&self) -> usize {
        self.desc.leaddim
    }

    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }

    pub fn item_size(&self) -> usize {
        self.desc.item_size()
    }

    pub fn tags(&self) -> &Tags {
        &self.desc.tags
    }

    pub fn kind(&self) -> OperandKind<'_, B> {
        match &self.storage {
            Storage::Direct(_) => OperandKind::Direct,
            Storage::SubViewOf { owner, .. } => OperandKind::SubViewOf(owner),
        }
    }

    /// The direct matrix that owns this matrix's buffer.
    pub fn backing(&self) -> &Matrix<B> {
        match &self.storage {
            Storage::Direct(_) => self,
            Storage::SubViewOf { owner, .. } => owner.backing(),
        }
    }

    /// Address of element (0, 0).
    pub fn device_ptr(&self) -> DevicePtr<'_, B> {
        match &self.storage {
            Storage::Direct(buffer) => DevicePtr { buffer, offset: 0 },
            Storage::SubViewOf { owner, offset } => {
                let base = owner.device_ptr();
                DevicePtr {
                    buffer: base.buffer,
                    offset: base.offset + offset,
                }
            }
        }
    }

    /// Read the current values into a dense host snapshot.
    pub fn get(&self, backend: &B) -> Result<DenseMatrix> {
        let ptr = self.device_ptr();
        let bytes = backend.read_buffer(ptr.buffer).map_err(SpmmError::device)?;
        let item = self.item_size();
        let mut data = Vec::with_capacity(self.rows() * self.cols());
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                let at = ptr.offset + (i * self.leaddim() + j) * item;
                let value = bytes
                    .get(at..at + item)
                    .and_then(|chunk| self.dtype().read(chunk))
                    .ok_or_else(|| self.out_of_bounds(at, bytes.len()))?;
                data.push(value);
            }
        }
        DenseMatrix::from_vec(self.rows(), self.cols(), data)
    }

    /// Overwrite the matrix's elements, leaving padding untouched.
    pub fn set(&self, backend: &B, values: &DenseMatrix) -> Result<()> {
        if values.rows() != self.rows() || values.cols() != self.cols() {
            return Err(SpmmError::Layout(format!(
                "{}: cannot set {}x{} values on a {}x{} matrix",
                self.id(),
                values.rows(),
                values.cols(),
                self.rows(),
                self.cols()
            )));
        }
        let ptr = self.device_ptr();
        let mut bytes = backend.read_buffer(ptr.buffer).map_err(SpmmError::device)?;
        let item = self.item_size();
        let len = bytes.len();
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                let at = ptr.offset + (i * self.leaddim() + j) * item;
                let written = bytes
                    .get_mut(at..at + item)
                    .map(|chunk| self.dtype().write(values.get(i, j), chunk))
                    .unwrap_or(false);
                if !written {
                    return Err(self.out_of_bounds(at, len));
                }
            }
        }
        backend
            .write_buffer(ptr.buffer, &bytes)
            .map_err(SpmmError::device)
    }

    /// Raw copy of the whole backing buffer.
    pub fn snapshot(&self, backend: &B) -> Result<Vec<u8>> {
        let root = self.backing().device_ptr();
        backend.read_buffer(root.buffer).map_err(SpmmError::device)
    }

    /// Write back a copy taken by [`snapshot`](Self::snapshot).
    pub fn restore(&self, backend: &B, bytes: &[u8]) -> Result<()> {
        let root = self.backing().device_ptr();
        backend
            .write_buffer(root.buffer, bytes)
            .map_err(SpmmError::device)
    }

    fn out_of_bounds(&self, at: usize, len: usize) -> SpmmError {
        SpmmError::Layout(format!(
            "{}: element at byte {at} is outside a {len}-byte buffer",
            self.id()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{host_matrix, HostBackend};

    #[test]
    fn test_get_skips_padding() {
        let dev = HostBackend::new();
        let desc = OperandDescriptor::new(2, 2, DType::F64).with_leaddim(3);
        let m = host_matrix(&dev, desc, &[1.0, 2.0, 3.0, 4.0]);
        let dense = m.get(&dev).unwrap();
        assert_eq!(dense.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sub_view_resolves_to_direct_root() {
        let dev = HostBackend::new();
        let desc = OperandDescriptor::new(3, 3, DType::F64);
        let values: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let parent = Arc::new(host_matrix(&dev, desc, &values));
        let view = Matrix::sub_view(&parent, 1, 1, 2, 2).unwrap();

        assert!(matches!(parent.kind(), OperandKind::Direct));
        assert!(matches!(view.kind(), OperandKind::SubViewOf(_)));
        assert_eq!(view.backing().id(), parent.id());
        assert_eq!(view.device_ptr().offset, 4 * 8);
        assert_eq!(view.get(&dev).unwrap().as_slice(), &[4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn test_sub_view_set_leaves_rest_of_owner() {
        let dev = HostBackend::new();
        let desc = OperandDescriptor::new(2, 3, DType::F32);
        let parent = Arc::new(host_matrix(&dev, desc, &[0.0; 6]));
        let view = Matrix::sub_view(&parent, 0, 1, 2, 1).unwrap();
        view.set(&dev, &DenseMatrix::from_vec(2, 1, vec![7.0, 9.0]).unwrap())
            .unwrap();
        assert_eq!(
            parent.get(&dev).unwrap().as_slice(),
            &[0.0, 7.0, 0.0, 0.0, 9.0, 0.0]
        );
    }

    #[test]
    fn test_snapshot_restore_targets_backing_buffer() {
        let dev = HostBackend::new();
        let desc = OperandDescriptor::new(2, 2, DType::F64);
        let parent = Arc::new(host_matrix(&dev, desc, &[1.0, 2.0, 3.0, 4.0]));
        let view = Matrix::sub_view(&parent, 1, 0, 1, 2).unwrap();

        let saved = view.snapshot(&dev).unwrap();
        parent.set(&dev, &DenseMatrix::zeros(2, 2)).unwrap();
        view.restore(&dev, &saved).unwrap();
        assert_eq!(parent.get(&dev).unwrap().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_out_of_range_view_is_rejected() {
        let dev = HostBackend::new();
        let parent = Arc::new(host_matrix(
            &dev,
            OperandDescriptor::new(2, 2, DType::F64),
            &[0.0; 4],
        ));
        assert!(Matrix::sub_view(&parent, 1, 1, 2, 1).is_err());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let dev = HostBackend::new();
        let desc = OperandDescriptor::new(2, 2, DType::F64);
        let err = Matrix::new(&dev, desc, dev.buffer(vec![0u8; 8])).err().unwrap();
        assert!(matches!(err, SpmmError::Layout(_)));
    }
}
