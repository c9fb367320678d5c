//! Writer variant dispatch.

use std::path::Path;

use karst_error::{KarstError, Result};
use karst_types::IoType;

use crate::buffered::BufferedWriter;
use crate::mapped::MappedWriter;

/// Open a writer for `path` using the backend selected by `io_type`.
pub fn open_writer(path: &Path, io_type: IoType) -> Result<FileWriter> {
    match io_type {
        IoType::Buffered => Ok(FileWriter::Buffered(BufferedWriter::open(path)?)),
        IoType::Mapped => Ok(FileWriter::Mapped(MappedWriter::open(path)?)),
    }
}

/// A writer backend, dispatched by variant.
///
/// Both variants provide the same positional and cursor write surface;
/// only [`FileWriter::Mapped`] supports [`FileWriter::remap`].
#[derive(Debug)]
pub enum FileWriter {
    Buffered(BufferedWriter),
    Mapped(MappedWriter),
}

impl FileWriter {
    /// Move the sequential-write cursor to `offset`.
    pub fn position(&mut self, offset: u64) {
        match self {
            FileWriter::Buffered(w) => w.position(offset),
            FileWriter::Mapped(w) => w.position(offset),
        }
    }

    /// Write a little-endian i16 at the cursor and advance it.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i16(value),
            FileWriter::Mapped(w) => w.write_i16(value),
        }
    }

    /// Write a little-endian i32 at the cursor and advance it.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i32(value),
            FileWriter::Mapped(w) => w.write_i32(value),
        }
    }

    /// Write a little-endian i64 at the cursor and advance it.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i64(value),
            FileWriter::Mapped(w) => w.write_i64(value),
        }
    }

    /// Write a little-endian i16 at `offset` without moving the cursor.
    pub fn write_i16_at(&mut self, offset: u64, value: i16) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i16_at(offset, value),
            FileWriter::Mapped(w) => w.write_i16_at(offset, value),
        }
    }

    /// Write a little-endian i32 at `offset` without moving the cursor.
    pub fn write_i32_at(&mut self, offset: u64, value: i32) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i32_at(offset, value),
            FileWriter::Mapped(w) => w.write_i32_at(offset, value),
        }
    }

    /// Write a little-endian i64 at `offset` without moving the cursor.
    pub fn write_i64_at(&mut self, offset: u64, value: i64) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.write_i64_at(offset, value),
            FileWriter::Mapped(w) => w.write_i64_at(offset, value),
        }
    }

    /// Propagate buffered writes to the OS.
    pub fn flush(&mut self) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.flush(),
            FileWriter::Mapped(w) => w.flush(),
        }
    }

    /// Durably sync to stable storage.
    pub fn force(&mut self) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.force(),
            FileWriter::Mapped(w) => w.force(),
        }
    }

    /// Whether this variant can refresh its mapping in place.
    #[must_use]
    pub fn supports_remap(&self) -> bool {
        matches!(self, FileWriter::Mapped(_))
    }

    /// Refresh the mapping after the backing file's size changed.
    ///
    /// Returns [`KarstError::RemapUnsupported`] on the buffered variant.
    pub fn remap(&mut self) -> Result<()> {
        match self {
            FileWriter::Buffered(_) => Err(KarstError::RemapUnsupported),
            FileWriter::Mapped(w) => w.remap(),
        }
    }

    /// Flush and release the underlying handle.
    pub fn close(self) -> Result<()> {
        match self {
            FileWriter::Buffered(w) => w.close(),
            FileWriter::Mapped(w) => w.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(len: u64) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("writer.dat");
        let file = std::fs::File::create(&path).expect("create");
        file.set_len(len).expect("set_len");
        (dir, path)
    }

    #[test]
    fn test_remap_capability_by_variant() {
        let (_dir, path) = temp_file(16);

        let mut buffered = open_writer(&path, IoType::Buffered).unwrap();
        assert!(!buffered.supports_remap());
        assert!(matches!(
            buffered.remap(),
            Err(KarstError::RemapUnsupported)
        ));
        buffered.close().unwrap();

        let mut mapped = open_writer(&path, IoType::Mapped).unwrap();
        assert!(mapped.supports_remap());
        mapped.remap().unwrap();
        mapped.close().unwrap();
    }

    #[test]
    fn test_both_variants_share_the_write_surface() {
        for io_type in [IoType::Buffered, IoType::Mapped] {
            let (_dir, path) = temp_file(32);

            let mut w = open_writer(&path, io_type).unwrap();
            w.write_i32_at(0, 99).unwrap();
            w.position(8);
            w.write_i64(-1).unwrap();
            w.flush().unwrap();
            w.force().unwrap();
            w.close().unwrap();

            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[..4], &99_i32.to_le_bytes());
            assert_eq!(&bytes[8..16], &(-1_i64).to_le_bytes());
        }
    }
}
