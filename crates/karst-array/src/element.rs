//! The closed set of fixed-width element types.
//!
//! Bulk loads and resets are generic over [`FixedElement`] instead of being
//! duplicated per width. The trait is sealed: exactly `i16`, `i32` and
//! `i64` implement it, matching the element sizes a file can declare.

use karst_error::Result;
use karst_io::{FileReader, FileWriter};
use karst_types::ElementKind;

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// A fixed-width element an array file can store in bulk.
pub trait FixedElement: sealed::Sealed + Copy {
    /// The element kind corresponding to this width.
    const KIND: ElementKind;

    /// Read one element at the reader's cursor.
    fn read_from(reader: &mut FileReader) -> Result<Self>;

    /// Write one element at the writer's cursor.
    fn write_to(self, writer: &mut FileWriter) -> Result<()>;
}

impl FixedElement for i16 {
    const KIND: ElementKind = ElementKind::Int16;

    fn read_from(reader: &mut FileReader) -> Result<Self> {
        reader.read_i16()
    }

    fn write_to(self, writer: &mut FileWriter) -> Result<()> {
        writer.write_i16(self)
    }
}

impl FixedElement for i32 {
    const KIND: ElementKind = ElementKind::Int32;

    fn read_from(reader: &mut FileReader) -> Result<Self> {
        reader.read_i32()
    }

    fn write_to(self, writer: &mut FileWriter) -> Result<()> {
        writer.write_i32(self)
    }
}

impl FixedElement for i64 {
    const KIND: ElementKind = ElementKind::Int64;

    fn read_from(reader: &mut FileReader) -> Result<Self> {
        reader.read_i64()
    }

    fn write_to(self, writer: &mut FileWriter) -> Result<()> {
        writer.write_i64(self)
    }
}
