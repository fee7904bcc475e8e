use super::Geometry;
use std::fmt;

/// The coarse dimensionality of a feature geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
	Point,
	Line,
	Polygon,
	/// A geometry collection mixing dimensions.
	Mixed,
}

impl GeometryKind {
	/// Classifies a geometry. Empty collections are [`GeometryKind::Mixed`].
	#[must_use]
	pub fn of(geometry: &Geometry) -> GeometryKind {
		use geo::Geometry::*;
		match geometry {
			Point(_) | MultiPoint(_) => GeometryKind::Point,
			Line(_) | LineString(_) | MultiLineString(_) => GeometryKind::Line,
			Polygon(_) | MultiPolygon(_) | Rect(_) | Triangle(_) => GeometryKind::Polygon,
			GeometryCollection(collection) => {
				let mut kinds = collection.iter().map(GeometryKind::of);
				match kinds.next() {
					Some(first) if kinds.all(|k| k == first) => first,
					_ => GeometryKind::Mixed,
				}
			}
		}
	}

	/// Whether tolerance for this kind is derived from the precise (finer) tile size.
	///
	/// Points are never simplified, so they use the coarser zoom-scaled size.
	#[must_use]
	pub fn is_precise(&self) -> bool {
		*self != GeometryKind::Point
	}
}

impl fmt::Display for GeometryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			GeometryKind::Point => "point",
			GeometryKind::Line => "line",
			GeometryKind::Polygon => "polygon",
			GeometryKind::Mixed => "mixed",
		})
	}
}
