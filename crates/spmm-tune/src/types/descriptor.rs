use super::DType;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a logical matrix.
///
/// Stays the same for the "same" matrix even if its storage is reallocated,
/// so it is assigned by the operand layer rather than derived from an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperandId(u64);

impl OperandId {
    /// Allocate a process-unique identity.
    pub fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Descriptive tags attached to an operand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Values of the matrix never change.
    pub const CONST: &'static str = "const";
    /// Rows are padded to the device alignment.
    pub const ALIGN: &'static str = "align";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.0.insert(tag.into());
        self
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_const(&self) -> bool {
        self.contains(Self::CONST)
    }

    pub fn is_aligned(&self) -> bool {
        self.contains(Self::ALIGN)
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Shape, layout and metadata of a matrix operand.
#[derive(Debug, Clone, PartialEq)]
pub struct OperandDescriptor {
    pub id: OperandId,
    pub rows: usize,
    pub cols: usize,
    /// Row stride in elements.
    pub leaddim: usize,
    pub dtype: DType,
    pub tags: Tags,
}

impl OperandDescriptor {
    /// Dense row-major descriptor (`leaddim == cols`) with a fresh identity.
    pub fn new(rows: usize, cols: usize, dtype: DType) -> Self {
        Self {
            id: OperandId::fresh(),
            rows,
            cols,
            leaddim: cols,
            dtype,
            tags: Tags::new(),
        }
    }

    pub fn with_leaddim(mut self, leaddim: usize) -> Self {
        self.leaddim = leaddim;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_id(mut self, id: OperandId) -> Self {
        self.id = id;
        self
    }

    pub fn item_size(&self) -> usize {
        self.dtype.item_size()
    }

    /// Bytes spanned from the first to one past the last element.
    pub fn span_bytes(&self) -> usize {
        if self.rows == 0 || self.cols == 0 {
            return 0;
        }
        ((self.rows - 1) * self.leaddim + self.cols) * self.item_size()
    }
}
