use crate::GeometryKind;

/// Type tag of a [`crate::VectorTileItem`], stored as one byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileGeometryType {
	#[default]
	Unknown = 0,
	Point = 1,
	Line = 2,
	Polygon = 3,
}

impl TileGeometryType {
	pub fn as_u8(&self) -> u8 {
		*self as u8
	}
}

impl From<u8> for TileGeometryType {
	fn from(value: u8) -> Self {
		match value {
			1 => TileGeometryType::Point,
			2 => TileGeometryType::Line,
			3 => TileGeometryType::Polygon,
			_ => TileGeometryType::Unknown,
		}
	}
}

impl From<GeometryKind> for TileGeometryType {
	fn from(kind: GeometryKind) -> Self {
		match kind {
			GeometryKind::Point => TileGeometryType::Point,
			GeometryKind::Line => TileGeometryType::Line,
			GeometryKind::Polygon => TileGeometryType::Polygon,
			GeometryKind::Mixed => TileGeometryType::Unknown,
		}
	}
}
