use std::fmt;

/// A system change number: the monotonically advancing 64-bit sequence tag
/// callers stamp on batched updates.
///
/// SCNs act as a logical clock for recovery. The array file persists two of
/// them — the low and high water marks — and the invariant `lwm <= hwm`
/// classifies every on-disk state as either consistent (`lwm == hwm`) or
/// mid-update (`lwm < hwm`, redo replay required).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct Scn(u64);

impl Scn {
    /// The zero SCN: the state of a freshly created array file.
    pub const ZERO: Self = Self(0);

    /// Create an SCN from a raw u64.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Scn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Scn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The closed set of fixed element widths an array file can store.
///
/// Every element in a given file has the same width; the width is recorded
/// in the header and never changes for the life of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElementKind {
    /// 2-byte elements.
    Int16,
    /// 4-byte elements.
    Int32,
    /// 8-byte elements.
    Int64,
}

impl ElementKind {
    /// Bytes per element.
    #[inline]
    #[must_use]
    pub const fn size_bytes(self) -> i32 {
        match self {
            ElementKind::Int16 => 2,
            ElementKind::Int32 => 4,
            ElementKind::Int64 => 8,
        }
    }

    /// Map an on-disk element size back to a kind.
    ///
    /// Returns `None` for any size outside the closed set `{2, 4, 8}`.
    #[must_use]
    pub const fn from_size(size: i32) -> Option<Self> {
        match size {
            2 => Some(ElementKind::Int16),
            4 => Some(ElementKind::Int32),
            8 => Some(ElementKind::Int64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Int16 => f.write_str("int16"),
            ElementKind::Int32 => f.write_str("int32"),
            ElementKind::Int64 => f.write_str("int64"),
        }
    }
}

/// Selects the I/O backend for an array file.
///
/// Both variants honour the same semantic contract; only the mapped variant
/// supports in-place remapping after a resize.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum IoType {
    /// Conventional positional file I/O.
    Buffered,
    /// Memory-mapped I/O.
    #[default]
    Mapped,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoType::Buffered => f.write_str("buffered"),
            IoType::Mapped => f.write_str("mapped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scn_ordering() {
        assert!(Scn::new(1) < Scn::new(2));
        assert_eq!(Scn::ZERO, Scn::new(0));
        assert_eq!(Scn::new(42).get(), 42);
    }

    #[test]
    fn test_scn_max_is_usable_for_water_marks() {
        let hwm = Scn::new(99);
        let lwm = Scn::ZERO;
        assert_eq!(lwm.max(hwm), hwm);
    }

    #[test]
    fn test_element_kind_sizes() {
        assert_eq!(ElementKind::Int16.size_bytes(), 2);
        assert_eq!(ElementKind::Int32.size_bytes(), 4);
        assert_eq!(ElementKind::Int64.size_bytes(), 8);
    }

    #[test]
    fn test_element_kind_from_size_round_trip() {
        for kind in [ElementKind::Int16, ElementKind::Int32, ElementKind::Int64] {
            assert_eq!(ElementKind::from_size(kind.size_bytes()), Some(kind));
        }
    }

    #[test]
    fn test_element_kind_rejects_other_sizes() {
        for size in [-8, -1, 0, 1, 3, 5, 6, 7, 9, 16] {
            assert_eq!(ElementKind::from_size(size), None);
        }
    }

    #[test]
    fn test_io_type_default_is_mapped() {
        assert_eq!(IoType::default(), IoType::Mapped);
    }
}
