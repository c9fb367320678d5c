//! The array file handle and its durable update protocol.
//!
//! An [`ArrayFile`] owns one on-disk file: a 1024-byte header followed by a
//! packed body of fixed-width elements. Batched updates follow the
//! HWM → data → LWM write ordering, each step flushed before the next, so
//! that a crash at any point leaves the header classifying the file as
//! either fully consistent (`lwm == hwm`) or mid-update (`lwm < hwm`,
//! replayable from an external redo log).

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, warn};

use karst_error::{KarstError, Result};
use karst_io::{open_reader, open_writer, FileWriter};
use karst_types::{ElementKind, IoType, Scn};

use crate::element::FixedElement;
use crate::entry::{flatten_and_sort, Entry};
use crate::header::{
    ArrayHeader, ARRAY_HEADER_LENGTH, ARRAY_LENGTH_OFFSET, DATA_START_OFFSET, ELEMENT_SIZE_OFFSET,
    HWM_SCN_OFFSET, LWM_SCN_OFFSET, VERSION_OFFSET,
};

/// Open-time options for an [`ArrayFile`].
///
/// `initial_length` and `element_kind` only apply when the file does not
/// exist yet; opening an existing file takes its geometry from the header.
#[derive(Debug, Clone, Copy)]
pub struct ArrayFileOptions {
    initial_length: i32,
    element_kind: ElementKind,
    io_type: IoType,
}

impl ArrayFileOptions {
    /// Options with the default mapped backend.
    #[must_use]
    pub fn new(initial_length: i32, element_kind: ElementKind) -> Self {
        Self {
            initial_length,
            element_kind,
            io_type: IoType::default(),
        }
    }

    /// Select the I/O backend.
    #[must_use]
    pub fn io_type(mut self, io_type: IoType) -> Self {
        self.io_type = io_type;
        self
    }
}

/// A durable fixed-element flat array backed by a single file.
///
/// The handle is the monitor: operations take `&mut self`, so a batch
/// update can never interleave with a reset or a resize on the same handle.
/// Callers that share a handle across threads wrap it in a `Mutex`.
#[derive(Debug)]
pub struct ArrayFile {
    path: PathBuf,
    io_type: IoType,
    writer: Option<FileWriter>,
    header: ArrayHeader,
}

impl ArrayFile {
    /// Open the array file at `path`, creating it if it does not exist.
    ///
    /// A new file gets a zero-filled body of `initial_length` elements and
    /// a header with both water marks at zero. An existing file has its
    /// header loaded and validated; `CorruptHeader` is returned for a
    /// version mismatch, inverted water marks, or impossible geometry.
    pub fn open(path: impl AsRef<Path>, options: ArrayFileOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let new_file = !path.exists();

        let header = if new_file {
            if options.initial_length < 0 {
                return Err(KarstError::InvalidLength {
                    length: i64::from(options.initial_length),
                });
            }
            let header = ArrayHeader::new(options.initial_length, options.element_kind);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)?;
            file.set_len(header.file_length())?;
            header
        } else {
            read_header(&path)?
        };
        header.check()?;

        let writer = open_writer(&path, options.io_type)?;
        let mut array = Self {
            path,
            io_type: options.io_type,
            writer: Some(writer),
            header,
        };

        if new_file {
            array.save_header()?;
        }

        debug!(path = %array.path.display(), header = %array.header, "array file opened");
        Ok(array)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.writer.is_none() {
            return Err(KarstError::Closed);
        }
        Ok(())
    }

    fn writer_mut(&mut self) -> Result<&mut FileWriter> {
        self.writer.as_mut().ok_or(KarstError::Closed)
    }

    /// Byte offset of the element at `index`.
    ///
    /// Bounds are not checked here; callers own index discipline.
    fn element_offset(&self, index: i32) -> u64 {
        (DATA_START_OFFSET as i64 + i64::from(index) * i64::from(self.header.element_size)) as u64
    }

    // === Accessors ===

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The I/O backend this file was opened with.
    #[must_use]
    pub fn io_type(&self) -> IoType {
        self.io_type
    }

    /// The storage version from the header.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.header.version
    }

    /// The cached low water mark.
    #[must_use]
    pub fn lwm_scn(&self) -> Scn {
        self.header.lwm_scn
    }

    /// The cached high water mark.
    #[must_use]
    pub fn hwm_scn(&self) -> Scn {
        self.header.hwm_scn
    }

    /// Element count, in elements not bytes.
    #[must_use]
    pub fn array_length(&self) -> i32 {
        self.header.array_length
    }

    /// Bytes per element.
    #[must_use]
    pub fn element_size(&self) -> i32 {
        self.header.element_size
    }

    /// The element kind recorded in the header.
    #[must_use]
    pub fn element_kind(&self) -> ElementKind {
        self.header.element_kind()
    }

    // === Header manager ===

    /// Re-read the header from disk into the cache and validate it.
    pub fn load_header(&mut self) -> Result<()> {
        self.ensure_open()?;
        let header = read_header(&self.path)?;
        header.check()?;
        self.header = header;
        Ok(())
    }

    /// Write all five header fields at their fixed offsets and flush.
    pub fn save_header(&mut self) -> Result<()> {
        let header = self.header;
        self.write_version(header.version)?;
        self.write_lwm_scn(header.lwm_scn)?;
        self.write_hwm_scn(header.hwm_scn)?;
        self.write_array_length(header.array_length)?;
        self.write_element_size(header.element_size)?;
        self.writer_mut()?.flush()
    }

    // Field mutators: write one field and update the cache. No flush;
    // callers flush when ordering matters.

    fn write_version(&mut self, value: u64) -> Result<()> {
        self.writer_mut()?.write_i64_at(VERSION_OFFSET, value as i64)?;
        self.header.version = value;
        Ok(())
    }

    fn write_lwm_scn(&mut self, value: Scn) -> Result<()> {
        self.writer_mut()?
            .write_i64_at(LWM_SCN_OFFSET, value.get() as i64)?;
        self.header.lwm_scn = value;
        Ok(())
    }

    fn write_hwm_scn(&mut self, value: Scn) -> Result<()> {
        self.writer_mut()?
            .write_i64_at(HWM_SCN_OFFSET, value.get() as i64)?;
        self.header.hwm_scn = value;
        Ok(())
    }

    fn write_array_length(&mut self, value: i32) -> Result<()> {
        self.writer_mut()?.write_i32_at(ARRAY_LENGTH_OFFSET, value)?;
        self.header.array_length = value;
        Ok(())
    }

    fn write_element_size(&mut self, value: i32) -> Result<()> {
        self.writer_mut()?.write_i32_at(ELEMENT_SIZE_OFFSET, value)?;
        self.header.element_size = value;
        Ok(())
    }

    /// Set both water marks, HWM first with a flush between the two writes.
    ///
    /// Rejects `lwm > hwm`. The HWM-before-LWM ordering keeps a crash
    /// between the two writes classifiable by recovery.
    pub fn set_water_marks(&mut self, lwm: Scn, hwm: Scn) -> Result<()> {
        self.ensure_open()?;
        if lwm > hwm {
            return Err(KarstError::InvalidWaterMarks {
                lwm: lwm.get(),
                hwm: hwm.get(),
            });
        }
        self.write_hwm_scn(hwm)?;
        self.writer_mut()?.flush()?;
        self.write_lwm_scn(lwm)?;
        self.writer_mut()?.flush()
    }

    // === Element I/O ===

    /// Write a 2-byte element at `index`. Does not touch the water marks
    /// and does not flush.
    pub fn write_i16(&mut self, index: i32, value: i16) -> Result<()> {
        let offset = self.element_offset(index);
        self.writer_mut()?.write_i16_at(offset, value)
    }

    /// Write a 4-byte element at `index`. Does not touch the water marks
    /// and does not flush.
    pub fn write_i32(&mut self, index: i32, value: i32) -> Result<()> {
        let offset = self.element_offset(index);
        self.writer_mut()?.write_i32_at(offset, value)
    }

    /// Write an 8-byte element at `index`. Does not touch the water marks
    /// and does not flush.
    pub fn write_i64(&mut self, index: i32, value: i64) -> Result<()> {
        let offset = self.element_offset(index);
        self.writer_mut()?.write_i64_at(offset, value)
    }

    /// Load the whole body into memory.
    ///
    /// Returns `None` if the backing file is missing or empty, so first
    /// use can lazily initialise. The element width read is `E`'s, which
    /// callers keep consistent with the file's element kind.
    pub fn load_array<E: FixedElement>(&self) -> Result<Option<Vec<E>>> {
        self.ensure_open()?;
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() == 0 => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let start = Instant::now();
        let mut reader = open_reader(&self.path, self.io_type)?;
        let loaded: Result<Vec<E>> = (|| {
            reader.position(DATA_START_OFFSET)?;
            let count = usize::try_from(self.header.array_length).unwrap_or(0);
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(E::read_from(&mut reader)?);
            }
            Ok(out)
        })();
        let closed = reader.close();
        let out = loaded?;
        closed?;

        debug!(
            path = %self.path.display(),
            elements = out.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "array loaded"
        );
        Ok(Some(out))
    }

    /// Load the body sequentially into a caller-provided array.
    ///
    /// Reads up to the shorter of the body length and `target.len()`
    /// elements. A missing or empty backing file leaves `target` untouched.
    pub fn load_into<E: FixedElement>(&self, target: &mut [E]) -> Result<()> {
        self.ensure_open()?;
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() == 0 => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let start = Instant::now();
        let count = usize::try_from(self.header.array_length)
            .unwrap_or(0)
            .min(target.len());
        let mut reader = open_reader(&self.path, self.io_type)?;
        let loaded: Result<()> = (|| {
            reader.position(DATA_START_OFFSET)?;
            for slot in target.iter_mut().take(count) {
                *slot = E::read_from(&mut reader)?;
            }
            Ok(())
        })();
        let closed = reader.close();
        loaded?;
        closed?;

        debug!(
            path = %self.path.display(),
            elements = count,
            elapsed_us = start.elapsed().as_micros() as u64,
            "array loaded"
        );
        Ok(())
    }

    /// Overwrite the body with `data`, element by element from position 0.
    ///
    /// Flushes before repositioning to evict any buffered positional
    /// writes, then flushes the new body. Water marks are left untouched.
    pub fn reset<E: FixedElement>(&mut self, data: &[E]) -> Result<()> {
        self.ensure_open()?;
        let writer = self.writer_mut()?;
        writer.flush()?;
        writer.position(DATA_START_OFFSET);
        for element in data {
            element.write_to(writer)?;
        }
        writer.flush()
    }

    /// [`ArrayFile::reset`] followed by setting both water marks to
    /// `max_scn`.
    ///
    /// A non-atomic convenience for offline reinitialisation.
    pub fn reset_with_scn<E: FixedElement>(&mut self, data: &[E], max_scn: Scn) -> Result<()> {
        self.reset(data)?;
        debug!(scn = max_scn.get(), "reset water marks");
        self.write_hwm_scn(max_scn)?;
        self.write_lwm_scn(max_scn)?;
        self.writer_mut()?.flush()
    }

    /// Fill every element with an 8-byte value.
    ///
    /// Only valid when the element size is 8.
    pub fn reset_all(&mut self, value: i64) -> Result<()> {
        self.ensure_open()?;
        if self.header.element_size != 8 {
            return Err(KarstError::ElementSizeMismatch {
                expected: 8,
                actual: self.header.element_size,
            });
        }
        let count = self.header.array_length;
        let writer = self.writer_mut()?;
        writer.flush()?;
        writer.position(DATA_START_OFFSET);
        for _ in 0..count {
            writer.write_i64(value)?;
        }
        writer.flush()
    }

    /// [`ArrayFile::reset_all`] followed by setting both water marks to
    /// `max_scn`.
    pub fn reset_all_with_scn(&mut self, value: i64, max_scn: Scn) -> Result<()> {
        self.reset_all(value)?;
        debug!(scn = max_scn.get(), "reset water marks");
        self.write_hwm_scn(max_scn)?;
        self.write_lwm_scn(max_scn)?;
        self.writer_mut()?.flush()
    }

    // === Durable update protocol ===

    /// Apply a batch of entries atomically with respect to crash recovery.
    ///
    /// The entry values are flattened and sorted by position so the body is
    /// written sequentially. The batch SCN is
    /// `max(hwm, max over entries of max_scn)`; the protocol publishes it
    /// as the HWM (flush), applies the sorted values (flush), then commits
    /// it as the LWM (flush). A crash mid-protocol leaves `lwm < hwm`,
    /// which the external redo log resolves by replay.
    ///
    /// An empty batch returns without touching the file.
    pub fn update(&mut self, entries: &[Entry]) -> Result<()> {
        self.ensure_open()?;
        let start = Instant::now();

        let values = flatten_and_sort(entries);
        if values.is_empty() {
            return Ok(());
        }

        let mut max_scn = self.header.hwm_scn;
        for entry in entries {
            max_scn = max_scn.max(entry.max_scn());
        }

        let offsets: Vec<u64> = values.iter().map(|v| self.element_offset(v.pos())).collect();

        let writer = self.writer_mut()?;

        // Publish intent. After this flush a crash leaves lwm < hwm.
        debug!(hwm_scn = max_scn.get(), "write hwm");
        writer.write_i64_at(HWM_SCN_OFFSET, max_scn.get() as i64)?;
        writer.flush()?;

        for (value, offset) in values.iter().zip(&offsets) {
            value.apply(writer, *offset)?;
        }
        writer.flush()?;

        // Commit.
        debug!(lwm_scn = max_scn.get(), "write lwm");
        writer.write_i64_at(LWM_SCN_OFFSET, max_scn.get() as i64)?;
        writer.flush()?;

        self.header.hwm_scn = max_scn;
        self.header.lwm_scn = max_scn;

        debug!(
            path = %self.path.display(),
            entries = entries.len(),
            values = values.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "entries flushed"
        );
        Ok(())
    }

    // === Resize ===

    /// Change the element count to `array_length`.
    pub fn set_array_length(&mut self, array_length: i32) -> Result<()> {
        self.set_array_length_renaming(array_length, None)
    }

    /// Change the element count, optionally renaming the file.
    ///
    /// Grows with zero fill, shrinks by discarding the tail, then records
    /// the new length in the header and refreshes the writer: reopened at
    /// the rename target when one was supplied and the rename succeeded,
    /// remapped in place for the mapped variant, or closed and reopened
    /// otherwise. A failed rename is logged and the operation continues
    /// against the original path.
    pub fn set_array_length_renaming(
        &mut self,
        array_length: i32,
        rename_to: Option<&Path>,
    ) -> Result<()> {
        self.ensure_open()?;
        if array_length < 0 {
            return Err(KarstError::InvalidLength {
                length: i64::from(array_length),
            });
        }
        if self.header.array_length == array_length {
            return Ok(());
        }

        self.writer_mut()?.flush()?;

        let file_length =
            ARRAY_HEADER_LENGTH + array_length as u64 * self.header.element_size as u64;
        let file = OpenOptions::new().write(true).open(&self.path)?;
        if let Err(e) = file.set_len(file_length) {
            error!(
                path = %self.path.display(),
                array_length,
                error = %e,
                "failed to resize backing file"
            );
            return Err(e.into());
        }
        drop(file);

        self.write_array_length(array_length)?;
        self.writer_mut()?.flush()?;

        if let Some(target) = rename_to {
            match fs::rename(&self.path, target) {
                Ok(()) => {
                    if let Some(writer) = self.writer.take() {
                        writer.close()?;
                    }
                    self.path = target.to_path_buf();
                    self.writer = Some(open_writer(&self.path, self.io_type)?);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        from = %self.path.display(),
                        to = %target.display(),
                        error = %e,
                        "rename failed, continuing with the original path"
                    );
                }
            }
        }

        let writer = self.writer_mut()?;
        if writer.supports_remap() {
            writer.remap()?;
            debug!(path = %self.path.display(), file_length, "remapped");
        } else {
            if let Some(writer) = self.writer.take() {
                writer.close()?;
            }
            self.writer = Some(open_writer(&self.path, self.io_type)?);
        }
        Ok(())
    }

    // === Flush and lifecycle ===

    /// Propagate any buffered writes to the OS.
    pub fn flush(&mut self) -> Result<()> {
        self.writer_mut()?.flush()
    }

    /// Durably sync the file to stable storage.
    pub fn force(&mut self) -> Result<()> {
        self.writer_mut()?.force()
    }

    /// Flush and release the writer.
    ///
    /// Closing an already-closed handle has no effect; every other
    /// operation on a closed handle returns [`KarstError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer.close(),
            None => Ok(()),
        }
    }
}

fn read_header(path: &Path) -> Result<ArrayHeader> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len < ARRAY_HEADER_LENGTH {
        return Err(KarstError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} is {len} bytes, smaller than the {ARRAY_HEADER_LENGTH}-byte header",
                path.display()
            ),
        )));
    }
    let mut buf = [0_u8; ARRAY_HEADER_LENGTH as usize];
    file.read_exact_at(&mut buf, 0)?;
    ArrayHeader::from_bytes(&buf)
}
