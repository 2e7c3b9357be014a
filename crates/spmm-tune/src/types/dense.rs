use crate::error::{Result, SpmmError};

/// Host-side snapshot of a matrix's values, row-major and unpadded.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SpmmError::Layout(format!(
                "Expected {} elements, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|v| **v != 0.0).count()
    }

    /// Copy with every element multiplied by `alpha`.
    pub fn scaled(&self, alpha: f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * alpha).collect(),
        }
    }

    /// Iterate the non-zeros as `(row, col, value)`.
    pub fn nonzeros(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let cols = self.cols;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(move |(idx, v)| (idx / cols, idx % cols, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_and_iterate_nonzeros() {
        let m = DenseMatrix::from_vec(2, 3, vec![0.0, 1.0, 0.0, 2.0, 0.0, -3.0]).unwrap();
        assert_eq!(m.count_nonzero(), 3);
        let nz: Vec<_> = m.nonzeros().collect();
        assert_eq!(nz, vec![(0, 1, 1.0), (1, 0, 2.0), (1, 2, -3.0)]);
    }

    #[test]
    fn test_scaled_keeps_zeros() {
        let m = DenseMatrix::from_vec(1, 3, vec![0.0, 2.0, 4.0]).unwrap();
        let s = m.scaled(0.5);
        assert_eq!(s.as_slice(), &[0.0, 1.0, 2.0]);
        assert_eq!(s.count_nonzero(), 2);
    }

    #[test]
    fn test_wrong_length_is_layout_error() {
        let err = DenseMatrix::from_vec(2, 2, vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, SpmmError::Layout(_)));
    }
}
