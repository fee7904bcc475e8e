//! Readers and writers for the fixed-width values of the binary tile format.
//!
//! Both sides are generic over the byte order. Tiles are always little-endian, hence the
//! `new_le` constructors.

mod value_reader;
mod value_reader_slice;
mod value_writer;
mod value_writer_blob;

pub use value_reader::*;
pub use value_reader_slice::*;
pub use value_writer::*;
pub use value_writer_blob::*;
