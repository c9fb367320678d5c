//! I/O backends for karst array files.
//!
//! Two backend variants share one semantic contract: positional and
//! cursor-style little-endian integer writes, `flush` (propagate buffered
//! writes to the OS) and `force` (durable on stable storage on return).
//! The mapped variant additionally supports `remap`, used after the backing
//! file has been resized. Callers select a backend with
//! [`karst_types::IoType`] and dispatch by variant through [`FileWriter`]
//! and [`FileReader`].

pub mod buffered;
pub mod mapped;
mod reader;
mod writer;

pub use buffered::{BufferedReader, BufferedWriter};
pub use mapped::{MappedReader, MappedWriter};
pub use reader::{open_reader, FileReader};
pub use writer::{open_writer, FileWriter};
