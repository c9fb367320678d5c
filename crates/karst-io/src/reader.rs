//! Reader variant dispatch.

use std::path::Path;

use karst_error::Result;
use karst_types::IoType;

use crate::buffered::BufferedReader;
use crate::mapped::MappedReader;

/// Open a reader for `path` using the backend selected by `io_type`.
pub fn open_reader(path: &Path, io_type: IoType) -> Result<FileReader> {
    match io_type {
        IoType::Buffered => Ok(FileReader::Buffered(BufferedReader::open(path)?)),
        IoType::Mapped => Ok(FileReader::Mapped(MappedReader::open(path)?)),
    }
}

/// A reader backend, dispatched by variant.
#[derive(Debug)]
pub enum FileReader {
    Buffered(BufferedReader),
    Mapped(MappedReader),
}

impl FileReader {
    /// Seek the read cursor to `offset`.
    pub fn position(&mut self, offset: u64) -> Result<()> {
        match self {
            FileReader::Buffered(r) => r.position(offset),
            FileReader::Mapped(r) => r.position(offset),
        }
    }

    /// Read a little-endian i16 at the cursor and advance it.
    pub fn read_i16(&mut self) -> Result<i16> {
        match self {
            FileReader::Buffered(r) => r.read_i16(),
            FileReader::Mapped(r) => r.read_i16(),
        }
    }

    /// Read a little-endian i32 at the cursor and advance it.
    pub fn read_i32(&mut self) -> Result<i32> {
        match self {
            FileReader::Buffered(r) => r.read_i32(),
            FileReader::Mapped(r) => r.read_i32(),
        }
    }

    /// Read a little-endian i64 at the cursor and advance it.
    pub fn read_i64(&mut self) -> Result<i64> {
        match self {
            FileReader::Buffered(r) => r.read_i64(),
            FileReader::Mapped(r) => r.read_i64(),
        }
    }

    /// Release the underlying handle.
    pub fn close(self) -> Result<()> {
        match self {
            FileReader::Buffered(r) => r.close(),
            FileReader::Mapped(r) => r.close(),
        }
    }
}
