//! Durable fixed-element array files.
//!
//! An array file is a flat, fixed-element-size, durably persisted array:
//! the persistence primitive underneath an embedded key/value engine. The
//! on-disk format is a 1024-byte header followed by a packed body:
//!
//! ```text
//! +---------------------------+
//! | Array header              |
//! |---------------------------|
//! | storage_version    | u64  |
//! | lwm_scn            | u64  |
//! | hwm_scn            | u64  |
//! | array_length       | i32  |
//! | element_size       | i32  |
//! |---------------------------|
//! | body starts at 1024       |
//! +---------------------------+
//! ```
//!
//! Batched updates are crash-consistent through the low/high water mark
//! protocol: the high water mark is published and flushed before any data
//! write, and the low water mark is committed only after all data has been
//! flushed. Recovery reads `lwm < hwm` as "a batch was in flight; replay
//! the redo log past lwm."

mod array_file;
mod element;
mod entry;
mod header;

pub use array_file::{ArrayFile, ArrayFileOptions};
pub use element::FixedElement;
pub use entry::{Entry, EntryValue};
pub use header::{ArrayHeader, ARRAY_HEADER_LENGTH, DATA_START_OFFSET, STORAGE_VERSION};
