//! Conventional positional file I/O backend.
//!
//! Writes go straight to the file descriptor with `pwrite`-style positional
//! calls, so `flush` has nothing buffered to push and only `force` touches
//! stable storage. The cursor used by the sequential write methods is
//! tracked in userspace and never issues a seek.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::Path;

use karst_error::{KarstError, Result};

/// A writer over a regular file using positional I/O.
#[derive(Debug)]
pub struct BufferedWriter {
    file: File,
    pos: u64,
}

impl BufferedWriter {
    /// Open the file at `path` for read-write access.
    ///
    /// The file must already exist; creation and sizing are the caller's
    /// concern.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file, pos: 0 })
    }

    /// Write the whole buffer at `offset`, looping over partial writes.
    fn write_all_at(&self, buf: &[u8], offset: u64) -> Result<()> {
        let mut total = 0_usize;
        while total < buf.len() {
            let n = self.file.write_at(&buf[total..], offset + total as u64)?;
            if n == 0 {
                return Err(KarstError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write_at returned 0",
                )));
            }
            total += n;
        }
        Ok(())
    }

    /// Move the sequential-write cursor to `offset`.
    pub fn position(&mut self, offset: u64) {
        self.pos = offset;
    }

    /// Write a little-endian i16 at the cursor and advance it.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), self.pos)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a little-endian i32 at the cursor and advance it.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), self.pos)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a little-endian i64 at the cursor and advance it.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), self.pos)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a little-endian i16 at `offset` without moving the cursor.
    pub fn write_i16_at(&mut self, offset: u64, value: i16) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), offset)
    }

    /// Write a little-endian i32 at `offset` without moving the cursor.
    pub fn write_i32_at(&mut self, offset: u64, value: i32) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), offset)
    }

    /// Write a little-endian i64 at `offset` without moving the cursor.
    pub fn write_i64_at(&mut self, offset: u64, value: i64) -> Result<()> {
        self.write_all_at(&value.to_le_bytes(), offset)
    }

    /// Propagate buffered writes to the OS.
    ///
    /// Positional writes land in the page cache directly, so there is
    /// nothing to do here.
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Durably sync file contents to stable storage.
    pub fn force(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Flush and release the file handle.
    ///
    /// Durability is the caller's concern via [`BufferedWriter::force`].
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

/// A sequential reader over a regular file.
#[derive(Debug)]
pub struct BufferedReader {
    reader: BufReader<File>,
}

impl BufferedReader {
    /// Open the file at `path` for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    /// Seek the read cursor to `offset`.
    pub fn position(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Read a little-endian i16 at the cursor and advance it.
    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0_u8; 2];
        self.reader.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    /// Read a little-endian i32 at the cursor and advance it.
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0_u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read a little-endian i64 at the cursor and advance it.
    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0_u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Release the file handle.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(len: u64) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("buffered.dat");
        let file = File::create(&path).expect("create");
        file.set_len(len).expect("set_len");
        (dir, path)
    }

    #[test]
    fn test_positional_writes_round_trip() {
        let (_dir, path) = temp_file(64);

        let mut w = BufferedWriter::open(&path).unwrap();
        w.write_i64_at(0, 0x1122_3344_5566_7788).unwrap();
        w.write_i32_at(8, -7).unwrap();
        w.write_i16_at(12, 513).unwrap();
        w.close().unwrap();

        let mut r = BufferedReader::open(&path).unwrap();
        assert_eq!(r.read_i64().unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_i16().unwrap(), 513);
    }

    #[test]
    fn test_cursor_writes_advance() {
        let (_dir, path) = temp_file(64);

        let mut w = BufferedWriter::open(&path).unwrap();
        w.position(16);
        w.write_i32(1).unwrap();
        w.write_i32(2).unwrap();
        w.write_i32(3).unwrap();
        w.force().unwrap();
        w.close().unwrap();

        let mut r = BufferedReader::open(&path).unwrap();
        r.position(16).unwrap();
        assert_eq!(r.read_i32().unwrap(), 1);
        assert_eq!(r.read_i32().unwrap(), 2);
        assert_eq!(r.read_i32().unwrap(), 3);
    }

    #[test]
    fn test_little_endian_on_disk() {
        let (_dir, path) = temp_file(8);

        let mut w = BufferedWriter::open(&path).unwrap();
        w.write_i32_at(0, 0x0403_0201).unwrap();
        w.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_read_past_end_is_an_error() {
        let (_dir, path) = temp_file(2);

        let mut r = BufferedReader::open(&path).unwrap();
        assert!(r.read_i16().is_ok());
        assert!(r.read_i16().is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.dat");
        assert!(BufferedWriter::open(&missing).is_err());
        assert!(BufferedReader::open(&missing).is_err());
    }
}
