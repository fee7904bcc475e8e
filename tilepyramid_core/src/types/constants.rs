//! World and tiling constants shared by every crate of the workspace.
//!
//! All world coordinates are in spherical mercator metres.

use super::Envelope;

/// Maximum absolute world coordinate on both axes.
pub const WORLD_MAX: f64 = 20_037_508.34;

/// Minimum world coordinate on both axes.
pub const WORLD_MIN: f64 = -WORLD_MAX;

/// Width (and height) of the world.
pub const WORLD_WIDTH: f64 = WORLD_MAX * 2.0;

/// The whole world as an envelope.
pub const WORLD_BOUNDS: Envelope = Envelope {
	min_x: WORLD_MIN,
	min_y: WORLD_MIN,
	max_x: WORLD_MAX,
	max_y: WORLD_MAX,
};

/// Factor applied to a tile envelope before clipping so boundary-crossing
/// geometry also renders in the neighbouring tiles.
pub const TILE_RESIZE: f64 = 1.1;

/// Base tile size in pixels.
pub const TILE_SIZE: u16 = 256;

/// Highest supported zoom level.
pub const MAX_ZOOM: u8 = 24;

/// Upper bound for the number of tiles returned by a single enumeration.
pub const MAX_TILES_COUNT: usize = 32_768;
