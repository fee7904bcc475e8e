use super::ValueWriter;
use crate::Blob;
use byteorder::{ByteOrder, LittleEndian};
use std::{io::Write, marker::PhantomData};

/// Writes values into a growing buffer that becomes a [`Blob`], e.g. a serialized tile.
pub struct ValueWriterBlob<E: ByteOrder> {
	buffer: Vec<u8>,
	_byte_order: PhantomData<E>,
}

impl<E: ByteOrder> ValueWriterBlob<E> {
	/// Creates a writer with room for `capacity` bytes.
	#[must_use]
	pub fn with_capacity(capacity: usize) -> ValueWriterBlob<E> {
		ValueWriterBlob {
			buffer: Vec::with_capacity(capacity),
			_byte_order: PhantomData,
		}
	}

	#[must_use]
	pub fn into_blob(self) -> Blob {
		Blob::from(self.buffer)
	}
}

impl ValueWriterBlob<LittleEndian> {
	#[must_use]
	pub fn new_le() -> ValueWriterBlob<LittleEndian> {
		ValueWriterBlob::with_capacity(0)
	}
}

impl<E: ByteOrder> ValueWriter<E> for ValueWriterBlob<E> {
	fn get_writer(&mut self) -> &mut dyn Write {
		&mut self.buffer
	}

	fn position(&self) -> u64 {
		self.buffer.len() as u64
	}
}
