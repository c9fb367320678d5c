//! Memory-mapped I/O backend.
//!
//! The whole file is mapped read-write; integer writes are byte copies into
//! the mapping. Stores are visible to the OS immediately, so `flush` is a
//! no-op and `force` issues an msync. After the backing file changes size
//! the mapping is stale; [`MappedWriter::remap`] re-establishes it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapMut};

use karst_error::{KarstError, Result};

fn out_of_bounds(offset: u64, len: usize, map_len: usize) -> KarstError {
    KarstError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("write of {len} bytes at offset {offset} exceeds mapped region of {map_len} bytes"),
    ))
}

/// A writer over a memory-mapped file.
#[derive(Debug)]
pub struct MappedWriter {
    file: File,
    map: MmapMut,
    pos: u64,
}

impl MappedWriter {
    /// Open the file at `path` and map it read-write in its entirety.
    ///
    /// The file must already exist and be non-empty; creation and sizing
    /// are the caller's concern.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { file, map, pos: 0 })
    }

    fn put(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let map_len = self.map.len();
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| out_of_bounds(offset, bytes.len(), map_len))?;
        if end > map_len as u64 {
            return Err(out_of_bounds(offset, bytes.len(), map_len));
        }
        let start = offset as usize;
        self.map[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Move the sequential-write cursor to `offset`.
    pub fn position(&mut self, offset: u64) {
        self.pos = offset;
    }

    /// Write a little-endian i16 at the cursor and advance it.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.put(self.pos, &value.to_le_bytes())?;
        self.pos += 2;
        Ok(())
    }

    /// Write a little-endian i32 at the cursor and advance it.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.put(self.pos, &value.to_le_bytes())?;
        self.pos += 4;
        Ok(())
    }

    /// Write a little-endian i64 at the cursor and advance it.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.put(self.pos, &value.to_le_bytes())?;
        self.pos += 8;
        Ok(())
    }

    /// Write a little-endian i16 at `offset` without moving the cursor.
    pub fn write_i16_at(&mut self, offset: u64, value: i16) -> Result<()> {
        self.put(offset, &value.to_le_bytes())
    }

    /// Write a little-endian i32 at `offset` without moving the cursor.
    pub fn write_i32_at(&mut self, offset: u64, value: i32) -> Result<()> {
        self.put(offset, &value.to_le_bytes())
    }

    /// Write a little-endian i64 at `offset` without moving the cursor.
    pub fn write_i64_at(&mut self, offset: u64, value: i64) -> Result<()> {
        self.put(offset, &value.to_le_bytes())
    }

    /// Propagate buffered writes to the OS.
    ///
    /// Stores into the mapping are already visible to the OS page cache.
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Durably sync the mapped region to stable storage.
    pub fn force(&mut self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }

    /// Re-map the backing file after its size has changed.
    ///
    /// The old mapping may extend past a shrunken file, so it is replaced
    /// without a final sync. The write cursor is left untouched; callers
    /// reposition before sequential writes.
    pub fn remap(&mut self) -> Result<()> {
        self.map = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }

    /// Flush and release the mapping.
    ///
    /// Durability is the caller's concern via [`MappedWriter::force`]; a
    /// stale mapping left over from a resize must be releasable without
    /// touching pages past the new end of file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

/// A sequential reader over a memory-mapped file.
#[derive(Debug)]
pub struct MappedReader {
    map: Mmap,
    pos: usize,
}

impl MappedReader {
    /// Open the file at `path` and map it read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map, pos: 0 })
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let remaining = self.map.len().saturating_sub(self.pos);
        if remaining < len {
            return Err(KarstError::ShortRead {
                expected: len,
                actual: remaining,
            });
        }
        let slice = &self.map[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Seek the read cursor to `offset`.
    pub fn position(&mut self, offset: u64) -> Result<()> {
        self.pos = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds usize"))?;
        Ok(())
    }

    /// Read a little-endian i16 at the cursor and advance it.
    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian i32 at the cursor and advance it.
    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian i64 at the cursor and advance it.
    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    /// Release the mapping.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
