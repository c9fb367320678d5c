use thiserror::Error;

/// Primary error type for karst operations.
///
/// Structured variants for the failure classes the engine distinguishes;
/// everything the OS reports funnels through [`KarstError::Io`].
#[derive(Error, Debug)]
pub enum KarstError {
    // === Header errors ===
    /// The on-disk header failed validation on load.
    #[error("corrupt array header: {detail}")]
    CorruptHeader { detail: String },

    /// A caller supplied water marks with `lwm > hwm`.
    #[error("invalid water marks: lwm={lwm} hwm={hwm}")]
    InvalidWaterMarks { lwm: u64, hwm: u64 },

    // === Geometry errors ===
    /// A negative array length was requested.
    #[error("invalid array length: {length}")]
    InvalidLength { length: i64 },

    /// An operation requires a specific element width.
    #[error("element size mismatch: expected {expected} bytes, found {actual}")]
    ElementSizeMismatch { expected: i32, actual: i32 },

    // === Handle errors ===
    /// Operation attempted on a closed array file.
    #[error("array file is closed")]
    Closed,

    // === I/O errors ===
    /// Underlying file or mapping operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes than expected came back from a read.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Remap was requested of a writer variant that has no mapping.
    #[error("remap is not supported by this writer")]
    RemapUnsupported,
}

impl KarstError {
    /// Build a [`KarstError::CorruptHeader`] from anything stringly.
    pub fn corrupt_header(detail: impl Into<String>) -> Self {
        Self::CorruptHeader {
            detail: detail.into(),
        }
    }
}

/// Result type used throughout karst.
pub type Result<T> = std::result::Result<T, KarstError>;
