//! Tile grid arithmetic.
//!
//! At zoom `z` the world is split into `2^z` tiles per axis. Tile bounds are always computed
//! as `WORLD_MIN + index * tile_size(z)` so adjacent tiles share bit-identical edges.
//!
//! # Examples
//!
//! ```
//! use tilepyramid_core::{WORLD_BOUNDS, tiles_for_extent};
//!
//! let tiles = tiles_for_extent(&WORLD_BOUNDS, 0, false, false);
//! assert_eq!(tiles.len(), 1);
//! assert_eq!(tiles[0].envelope, WORLD_BOUNDS);
//! ```

use crate::{Envelope, MAX_TILES_COUNT, TileAddress, TileExtent, WORLD_BOUNDS, WORLD_MIN, WORLD_WIDTH};

/// World width of one tile at `zoom`.
#[must_use]
pub fn tile_size(zoom: u8) -> f64 {
	WORLD_WIDTH / (1u64 << zoom) as f64
}

/// Envelope of the tile with the (possibly unwrapped) grid indices `x`, `y`.
#[must_use]
pub fn tile_envelope(zoom: u8, x: i64, y: i64) -> Envelope {
	let size = tile_size(zoom);
	Envelope {
		min_x: WORLD_MIN + x as f64 * size,
		min_y: WORLD_MIN + y as f64 * size,
		max_x: WORLD_MIN + (x + 1) as f64 * size,
		max_y: WORLD_MIN + (y + 1) as f64 * size,
	}
}

/// Half-open index range `[begin, end)` of the tiles covering `[min, max]` on one axis.
fn index_range(min: f64, max: f64, half_count: f64, size: f64) -> (i64, i64) {
	let begin = (min / size + half_count).floor() as i64;
	let mut end = (max / size + half_count).ceil() as i64;
	if end == begin {
		end += 1;
	}
	(begin, end)
}

/// Returns all tiles at `zoom` whose envelope intersects `extent`.
///
/// * `reverse_y` flips the row index (`2^zoom - 1 - y`) for raster-style addressing.
///   Envelopes are not affected.
/// * `allow_wrap_x` permits columns in `[-2^zoom, 2 * 2^zoom)`. Such columns are folded back
///   into `[0, 2^zoom)` and marked with `cross_extent = ±1`, while the envelope stays unwrapped.
///
/// At most [`MAX_TILES_COUNT`] tiles are returned.
#[must_use]
pub fn tiles_for_extent(extent: &Envelope, zoom: u8, reverse_y: bool, allow_wrap_x: bool) -> Vec<TileExtent> {
	if !extent.is_valid() {
		return Vec::new();
	}
	if zoom == 0 && extent.intersects(&WORLD_BOUNDS) {
		return vec![TileExtent::new(TileAddress::new(0, 0, 0), WORLD_BOUNDS)];
	}

	let tiles_in_dim = 1i64 << zoom;
	let half_count = tiles_in_dim as f64 / 2.0;
	let size = tile_size(zoom);

	let (mut begin_x, mut end_x) = index_range(extent.min_x, extent.max_x, half_count, size);
	let (mut begin_y, mut end_y) = index_range(extent.min_y, extent.max_y, half_count, size);

	begin_y = begin_y.max(0);
	end_y = end_y.min(tiles_in_dim);
	if allow_wrap_x {
		begin_x = begin_x.max(-tiles_in_dim);
		end_x = end_x.min(tiles_in_dim * 2);
	} else {
		begin_x = begin_x.max(0);
		end_x = end_x.min(tiles_in_dim);
	}
	if begin_x >= end_x || begin_y >= end_y {
		return Vec::new();
	}

	let mut result = Vec::new();
	for x in begin_x..end_x {
		let (real_x, cross_extent) = if x < 0 {
			(x + tiles_in_dim, -1)
		} else if x >= tiles_in_dim {
			(x - tiles_in_dim, 1)
		} else {
			(x, 0)
		};
		for y in begin_y..end_y {
			let envelope = tile_envelope(zoom, x, y);
			if !envelope.intersects(extent) {
				continue;
			}
			let real_y = if reverse_y { tiles_in_dim - 1 - y } else { y };
			let address = TileAddress::new(zoom, real_x as i32, real_y as i32).with_cross_extent(cross_extent);
			result.push(TileExtent::new(address, envelope));
			if result.len() >= MAX_TILES_COUNT {
				log::warn!("tile enumeration for {extent} at zoom {zoom} truncated to {MAX_TILES_COUNT} tiles");
				return result;
			}
		}
	}
	result
}
