//! # Examples
//!
//! ```rust
//! use tilepyramid_core::io::{ValueWriter, ValueWriterBlob};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut writer = ValueWriterBlob::new_le();
//!     writer.write_u16(1)?;
//!     writer.write_vertices(&[[1.0, -2.5]])?;
//!     assert_eq!(
//!         writer.into_blob().as_hex(),
//!         "01 00 00 00 80 3f 00 00 20 c0"
//!     );
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use byteorder::{ByteOrder, WriteBytesExt};
use std::io::Write;

/// Writes fixed-width values in the byte order `E`.
pub trait ValueWriter<E: ByteOrder> {
	fn get_writer(&mut self) -> &mut dyn Write;

	/// Number of bytes written so far.
	fn position(&self) -> u64;

	fn write_u8(&mut self, value: u8) -> Result<()> {
		Ok(self.get_writer().write_u8(value)?)
	}

	fn write_u16(&mut self, value: u16) -> Result<()> {
		Ok(self.get_writer().write_u16::<E>(value)?)
	}

	fn write_u32(&mut self, value: u32) -> Result<()> {
		Ok(self.get_writer().write_u32::<E>(value)?)
	}

	fn write_i64(&mut self, value: i64) -> Result<()> {
		Ok(self.get_writer().write_i64::<E>(value)?)
	}

	fn write_f32(&mut self, value: f32) -> Result<()> {
		Ok(self.get_writer().write_f32::<E>(value)?)
	}

	/// Writes vertices as `x, y` pairs of `f32`, without a count.
	fn write_vertices(&mut self, vertices: &[[f32; 2]]) -> Result<()> {
		let writer = self.get_writer();
		for [x, y] in vertices {
			writer.write_f32::<E>(*x)?;
			writer.write_f32::<E>(*y)?;
		}
		Ok(())
	}

	/// Writes triangle indices, without a count.
	fn write_indices(&mut self, indices: &[u16]) -> Result<()> {
		let writer = self.get_writer();
		for index in indices {
			writer.write_u16::<E>(*index)?;
		}
		Ok(())
	}
}
