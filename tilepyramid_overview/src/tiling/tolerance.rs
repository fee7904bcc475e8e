use tilepyramid_core::{Envelope, TileExtent, WORLD_WIDTH, tile_size, tiles_for_extent};

/// Tile size in pixels used to derive the simplification tolerance at `zoom`.
///
/// Precise geometry (lines, polygons) uses a fixed 512 px. Points shrink towards low zoom
/// levels starting from `base`, but never below 8 px.
#[must_use]
pub fn tile_size_pixels(zoom: u8, precise: bool, base: u16) -> f64 {
	if precise {
		512.0
	} else {
		let pixels = i32::from(base) - (20 - i32::from(zoom)) * 8;
		f64::from(pixels.max(8))
	}
}

/// The simplification tolerance at `zoom`: the world width of one pixel.
#[must_use]
pub fn tolerance(zoom: u8, precise: bool, base: u16) -> f64 {
	WORLD_WIDTH / ((1u64 << zoom) as f64 * tile_size_pixels(zoom, precise, base))
}

/// Grows `envelope` by a tenth of a tile on every side.
#[must_use]
pub fn extra_extent_for_zoom(zoom: u8, envelope: &Envelope) -> Envelope {
	envelope.expanded(tile_size(zoom) * 0.1)
}

/// The buffer-expanded tile set of a feature with the given envelope. May contain
/// wrapped tiles.
#[must_use]
pub fn feature_tiles(zoom: u8, envelope: &Envelope) -> Vec<TileExtent> {
	tiles_for_extent(&extra_extent_for_zoom(zoom, envelope), zoom, false, true)
}
