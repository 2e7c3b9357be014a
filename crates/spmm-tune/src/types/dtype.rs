use std::fmt;

/// Element type of a device matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn item_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    /// Decode one element from native-endian bytes.
    ///
    /// `bytes` must hold exactly [`item_size`](Self::item_size) bytes.
    pub fn read(self, bytes: &[u8]) -> Option<f64> {
        match self {
            DType::F32 => Some(f32::from_ne_bytes(bytes.try_into().ok()?) as f64),
            DType::F64 => Some(f64::from_ne_bytes(bytes.try_into().ok()?)),
        }
    }

    /// Encode one element into native-endian bytes.
    pub fn write(self, value: f64, out: &mut [u8]) -> bool {
        match self {
            DType::F32 if out.len() == 4 => {
                out.copy_from_slice(&(value as f32).to_ne_bytes());
                true
            }
            DType::F64 if out.len() == 8 => {
                out.copy_from_slice(&value.to_ne_bytes());
                true
            }
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_roundtrip_through_bytes() {
        let mut buf = [0u8; 4];
        assert!(DType::F32.write(1.5, &mut buf));
        assert_eq!(DType::F32.read(&buf), Some(1.5));
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let mut buf = [0u8; 4];
        assert!(!DType::F64.write(1.0, &mut buf));
        assert_eq!(DType::F64.read(&buf), None);
    }
}
