use super::TileGeometryType;
use anyhow::{Result, bail, ensure};
use tilepyramid_core::io::{ValueReader, ValueWriter};
use byteorder::LittleEndian;

/// Maximum number of vertices a single item can carry.
pub const MAX_ITEM_VERTICES: usize = u16::MAX as usize;

/// One output part of a clipped feature: a point set, a line or a triangulated polygon.
///
/// Vertices are `f32` offsets in world units from the tile's minimum corner. Polygons carry
/// triangle indices into their vertex list.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorTileItem {
	pub feature_id: i64,
	pub geometry_type: TileGeometryType,
	pub vertices: Vec<[f32; 2]>,
	pub indices: Vec<u16>,
}

impl VectorTileItem {
	pub fn new(feature_id: i64, geometry_type: TileGeometryType, vertices: Vec<[f32; 2]>) -> VectorTileItem {
		VectorTileItem {
			feature_id,
			geometry_type,
			vertices,
			indices: Vec::new(),
		}
	}

	pub fn with_indices(mut self, indices: Vec<u16>) -> VectorTileItem {
		self.indices = indices;
		self
	}

	pub fn is_valid(&self) -> bool {
		if self.vertices.is_empty() || self.vertices.len() > MAX_ITEM_VERTICES {
			return false;
		}
		match self.geometry_type {
			TileGeometryType::Point => true,
			TileGeometryType::Line => self.vertices.len() >= 2,
			TileGeometryType::Polygon => {
				!self.indices.is_empty()
					&& self.indices.len() % 3 == 0
					&& self.indices.iter().all(|i| usize::from(*i) < self.vertices.len())
			}
			TileGeometryType::Unknown => false,
		}
	}

	/// Whether the first and the last vertex coincide.
	pub fn is_closed(&self) -> bool {
		match (self.vertices.first(), self.vertices.last()) {
			(Some(first), Some(last)) => self.vertices.len() > 1 && first == last,
			_ => false,
		}
	}

	/// Number of bytes this item occupies in a serialized tile.
	pub fn encoded_len(&self) -> usize {
		let indices = if self.geometry_type == TileGeometryType::Polygon {
			4 + self.indices.len() * 2
		} else {
			0
		};
		8 + 1 + 2 + self.vertices.len() * 8 + indices
	}

	pub(crate) fn write(&self, writer: &mut dyn ValueWriter<LittleEndian>) -> Result<()> {
		ensure!(
			self.vertices.len() <= MAX_ITEM_VERTICES,
			"item of feature {} has {} vertices, at most {MAX_ITEM_VERTICES} are allowed",
			self.feature_id,
			self.vertices.len()
		);
		writer.write_i64(self.feature_id)?;
		writer.write_u8(self.geometry_type.as_u8())?;
		writer.write_u16(self.vertices.len() as u16)?;
		writer.write_vertices(&self.vertices)?;
		if self.geometry_type == TileGeometryType::Polygon {
			writer.write_u32(u32::try_from(self.indices.len())?)?;
			writer.write_indices(&self.indices)?;
		}
		Ok(())
	}

	pub(crate) fn read<'a>(reader: &mut dyn ValueReader<'a, LittleEndian>) -> Result<VectorTileItem> {
		let feature_id = reader.read_i64()?;
		let geometry_type = TileGeometryType::from(reader.read_u8()?);
		if geometry_type == TileGeometryType::Unknown {
			bail!("unknown geometry type in item of feature {feature_id}");
		}
		let vertex_count = usize::from(reader.read_u16()?);
		let vertices = reader.read_vertices(vertex_count)?;
		let indices = if geometry_type == TileGeometryType::Polygon {
			let index_count = reader.read_u32()? as usize;
			reader.read_indices(index_count)?
		} else {
			Vec::new()
		};
		Ok(VectorTileItem {
			feature_id,
			geometry_type,
			vertices,
			indices,
		})
	}
}
