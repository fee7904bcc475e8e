use crate::{Geometry, GeometryEngine, VectorTileItem};
use anyhow::Result;
use tilepyramid_core::{Envelope, TILE_RESIZE};

/// Produces the items of one feature for one tile.
///
/// The (already simplified) geometry is clipped against the tile envelope grown by
/// [`TILE_RESIZE`], so geometry crossing the tile border still renders in the neighbouring
/// tile. Vertices are expressed relative to the minimum corner of `tile_envelope`.
///
/// Nothing left after clipping yields no items.
///
/// # Errors
/// Propagates encoding errors from [`GeometryEngine::fill_tile_items`].
pub fn tile_geometry(
	engine: &dyn GeometryEngine,
	feature_id: i64,
	geometry: &Geometry,
	tile_envelope: &Envelope,
) -> Result<Vec<VectorTileItem>> {
	let mut items = Vec::new();
	let Some(clipped) = engine.clip(geometry, &tile_envelope.resized(TILE_RESIZE)) else {
		return Ok(items);
	};
	engine.fill_tile_items(
		feature_id,
		&clipped,
		[tile_envelope.min_x, tile_envelope.min_y],
		&mut items,
	)?;
	Ok(items)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{GeoEngine, TileGeometryType};
	use approx::assert_relative_eq;
	use geo::{LineString, Point};

	#[test]
	fn point_is_relative_to_tile_origin() {
		let tile = Envelope::new(100.0, 200.0, 200.0, 300.0);
		let geometry: Geometry = Point::new(150.0, 225.0).into();
		let items = tile_geometry(&GeoEngine, 3, &geometry, &tile).unwrap();
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].feature_id, 3);
		assert_eq!(items[0].geometry_type, TileGeometryType::Point);
		assert_eq!(items[0].vertices, vec![[50.0, 25.0]]);
	}

	#[test]
	fn buffer_keeps_nearby_geometry() {
		let tile = Envelope::new(0.0, 0.0, 100.0, 100.0);
		let inside_buffer: Geometry = Point::new(104.0, 50.0).into();
		let outside_buffer: Geometry = Point::new(106.0, 50.0).into();
		assert_eq!(tile_geometry(&GeoEngine, 1, &inside_buffer, &tile).unwrap().len(), 1);
		assert!(tile_geometry(&GeoEngine, 1, &outside_buffer, &tile).unwrap().is_empty());
	}

	#[test]
	fn line_is_cut_at_buffer() {
		let tile = Envelope::new(0.0, 0.0, 100.0, 100.0);
		let geometry: Geometry = LineString::from(vec![(50.0, 50.0), (250.0, 50.0)]).into();
		let items = tile_geometry(&GeoEngine, 8, &geometry, &tile).unwrap();
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].geometry_type, TileGeometryType::Line);
		let xs: Vec<f32> = items[0].vertices.iter().map(|v| v[0]).collect();
		let max_x = xs.iter().copied().fold(f32::MIN, f32::max);
		let min_x = xs.iter().copied().fold(f32::MAX, f32::min);
		assert_relative_eq!(max_x, 105.0, epsilon = 1e-3);
		assert_relative_eq!(min_x, 50.0, epsilon = 1e-3);
	}
}
