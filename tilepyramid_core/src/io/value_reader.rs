use anyhow::{Context, Result, ensure};
use byteorder::{ByteOrder, ReadBytesExt};
use std::io::Read;

/// Reads fixed-width values in the byte order `E`.
///
/// Implementors only provide the byte source and its bounds. List reads check the remaining
/// length first, so a corrupt count fails before anything is allocated for it.
pub trait ValueReader<'a, E: ByteOrder + 'a> {
	fn get_reader(&mut self) -> &mut dyn Read;

	/// Total number of readable bytes.
	fn len(&self) -> u64;

	fn position(&self) -> u64;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn remaining(&self) -> u64 {
		self.len().saturating_sub(self.position())
	}

	fn has_remaining(&self) -> bool {
		self.remaining() > 0
	}

	fn ensure_remaining(&self, bytes: u64) -> Result<()> {
		let remaining = self.remaining();
		ensure!(
			remaining >= bytes,
			"unexpected end of data at byte {}: need {bytes} bytes, {remaining} remaining",
			self.position()
		);
		Ok(())
	}

	fn read_u8(&mut self) -> Result<u8> {
		Ok(self.get_reader().read_u8()?)
	}

	fn read_u16(&mut self) -> Result<u16> {
		Ok(self.get_reader().read_u16::<E>()?)
	}

	fn read_u32(&mut self) -> Result<u32> {
		Ok(self.get_reader().read_u32::<E>()?)
	}

	fn read_i64(&mut self) -> Result<i64> {
		Ok(self.get_reader().read_i64::<E>()?)
	}

	fn read_f32(&mut self) -> Result<f32> {
		Ok(self.get_reader().read_f32::<E>()?)
	}

	/// Reads `count` vertices stored as `x, y` pairs of `f32`.
	fn read_vertices(&mut self, count: usize) -> Result<Vec<[f32; 2]>> {
		self
			.ensure_remaining(count as u64 * 8)
			.with_context(|| format!("Failed to read {count} vertices"))?;
		let mut vertices = Vec::with_capacity(count);
		for _ in 0..count {
			vertices.push([self.read_f32()?, self.read_f32()?]);
		}
		Ok(vertices)
	}

	/// Reads `count` `u16` triangle indices.
	fn read_indices(&mut self, count: usize) -> Result<Vec<u16>> {
		self
			.ensure_remaining(count as u64 * 2)
			.with_context(|| format!("Failed to read {count} indices"))?;
		let mut indices = Vec::with_capacity(count);
		for _ in 0..count {
			indices.push(self.read_u16()?);
		}
		Ok(indices)
	}
}
