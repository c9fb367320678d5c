//! The fixed 1024-byte array file header.
//!
//! Layout (all integers little-endian, frozen for storage version 0):
//!
//! ```text
//! Offset  Size  Field
//!   0       8   storage_version (u64)
//!   8       8   lwm_scn         (u64)
//!  16       8   hwm_scn         (u64)
//!  24       4   array_length    (i32, element count)
//!  28       4   element_size    (i32, bytes per element, one of 2/4/8)
//!  32     992   reserved (preserved verbatim, never written)
//! ```
//!
//! The header occupies a full 1024 bytes so the body start offset stays
//! constant across versions and aligned to common page sizes.

use std::fmt;

use karst_error::{KarstError, Result};
use karst_types::{ElementKind, Scn};

/// Total header size in bytes; the body starts immediately after.
pub const ARRAY_HEADER_LENGTH: u64 = 1024;

/// Byte offset of the first element.
pub const DATA_START_OFFSET: u64 = ARRAY_HEADER_LENGTH;

/// The storage version this implementation reads and writes.
pub const STORAGE_VERSION: u64 = 0;

pub(crate) const VERSION_OFFSET: u64 = 0;
pub(crate) const LWM_SCN_OFFSET: u64 = 8;
pub(crate) const HWM_SCN_OFFSET: u64 = 16;
pub(crate) const ARRAY_LENGTH_OFFSET: u64 = 24;
pub(crate) const ELEMENT_SIZE_OFFSET: u64 = 28;

/// The five live header fields, cached in memory by the array file handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    /// Storage version; must equal [`STORAGE_VERSION`].
    pub version: u64,
    /// Low water mark: the SCN of the last fully durable batch.
    pub lwm_scn: Scn,
    /// High water mark: the SCN of the most recent batch attempt.
    pub hwm_scn: Scn,
    /// Element count; never negative.
    pub array_length: i32,
    /// Bytes per element; one of 2, 4, 8.
    pub element_size: i32,
}

impl ArrayHeader {
    /// Header for a freshly created file: zero water marks, version 0.
    #[must_use]
    pub fn new(array_length: i32, kind: ElementKind) -> Self {
        Self {
            version: STORAGE_VERSION,
            lwm_scn: Scn::ZERO,
            hwm_scn: Scn::ZERO,
            array_length,
            element_size: kind.size_bytes(),
        }
    }

    /// Parse the live fields from the first header bytes.
    ///
    /// `buf` must cover at least the 32 live bytes; the reserved region is
    /// not inspected.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < 32 {
            return Err(KarstError::ShortRead {
                expected: 32,
                actual: buf.len(),
            });
        }

        let u64_at = |off: usize| {
            let mut b = [0_u8; 8];
            b.copy_from_slice(&buf[off..off + 8]);
            u64::from_le_bytes(b)
        };
        let i32_at = |off: usize| {
            let mut b = [0_u8; 4];
            b.copy_from_slice(&buf[off..off + 4]);
            i32::from_le_bytes(b)
        };

        Ok(Self {
            version: u64_at(VERSION_OFFSET as usize),
            lwm_scn: Scn::new(u64_at(LWM_SCN_OFFSET as usize)),
            hwm_scn: Scn::new(u64_at(HWM_SCN_OFFSET as usize)),
            array_length: i32_at(ARRAY_LENGTH_OFFSET as usize),
            element_size: i32_at(ELEMENT_SIZE_OFFSET as usize),
        })
    }

    /// Validate the header invariants.
    ///
    /// A header that fails any of these cannot have been produced by a
    /// completed operation of this implementation.
    pub fn check(&self) -> Result<()> {
        if self.version != STORAGE_VERSION {
            return Err(KarstError::corrupt_header(format!(
                "unsupported storage version {}, expected {STORAGE_VERSION}",
                self.version
            )));
        }
        if self.hwm_scn < self.lwm_scn {
            return Err(KarstError::corrupt_header(format!(
                "hwm {} < lwm {}",
                self.hwm_scn, self.lwm_scn
            )));
        }
        if self.array_length < 0 {
            return Err(KarstError::corrupt_header(format!(
                "negative array length {}",
                self.array_length
            )));
        }
        if ElementKind::from_size(self.element_size).is_none() {
            return Err(KarstError::corrupt_header(format!(
                "element size {} not in {{2, 4, 8}}",
                self.element_size
            )));
        }
        Ok(())
    }

    /// The element kind recorded in this header.
    ///
    /// Only meaningful after [`ArrayHeader::check`] has passed.
    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        ElementKind::from_size(self.element_size).unwrap_or(ElementKind::Int64)
    }

    /// File size implied by this header: header plus packed body.
    #[must_use]
    pub fn file_length(&self) -> u64 {
        ARRAY_HEADER_LENGTH + self.array_length.max(0) as u64 * self.element_size.max(0) as u64
    }
}

impl fmt::Display for ArrayHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} lwm_scn={} hwm_scn={} array_length={} element_size={}",
            self.version, self.lwm_scn, self.hwm_scn, self.array_length, self.element_size
        )
    }
}
