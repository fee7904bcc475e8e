//! # Examples
//!
//! ```rust
//! use tilepyramid_core::io::{ValueReader, ValueReaderSlice};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let data = [0x02, 0x00, 0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0x20, 0xc0];
//!     let mut reader = ValueReaderSlice::new_le(&data);
//!     let count = reader.read_u16()?;
//!     assert_eq!(count, 2);
//!     assert!(reader.read_vertices(usize::from(count)).is_err());
//!     Ok(())
//! }
//! ```

use super::ValueReader;
use byteorder::{ByteOrder, LittleEndian};
use std::{
	io::{Cursor, Read},
	marker::PhantomData,
};

/// Reads values from a borrowed byte slice, e.g. a cached tile row.
pub struct ValueReaderSlice<'a, E: ByteOrder> {
	cursor: Cursor<&'a [u8]>,
	_byte_order: PhantomData<E>,
}

impl<'a, E: ByteOrder> ValueReaderSlice<'a, E> {
	#[must_use]
	pub fn new(slice: &'a [u8]) -> ValueReaderSlice<'a, E> {
		ValueReaderSlice {
			cursor: Cursor::new(slice),
			_byte_order: PhantomData,
		}
	}
}

impl<'a> ValueReaderSlice<'a, LittleEndian> {
	#[must_use]
	pub fn new_le(slice: &'a [u8]) -> ValueReaderSlice<'a, LittleEndian> {
		ValueReaderSlice::new(slice)
	}
}

impl<'a, E: ByteOrder + 'a> ValueReader<'a, E> for ValueReaderSlice<'a, E> {
	fn get_reader(&mut self) -> &mut dyn Read {
		&mut self.cursor
	}

	fn len(&self) -> u64 {
		self.cursor.get_ref().len() as u64
	}

	fn position(&self) -> u64 {
		self.cursor.position()
	}
}
