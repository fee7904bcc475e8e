//! Tile addresses inside the pyramid.
//!
//! A [`TileAddress`] identifies a tile by zoom level and grid indices. When the world wraps
//! horizontally, a tile left or right of the world folds back onto a canonical column and
//! remembers the wrap in `cross_extent`.
//!
//! # Examples
//!
//! ```
//! use tilepyramid_core::TileAddress;
//!
//! let wrapped = TileAddress::new(3, 1, 2).with_cross_extent(-1);
//! assert_eq!(wrapped.canonical(), TileAddress::new(3, 1, 2));
//! assert!(wrapped.is_wrapped());
//! ```

use crate::MAX_ZOOM;
use anyhow::{Result, ensure};
use std::fmt::{self, Debug};

/// The address of a tile: zoom level, column, row and world-wrap marker.
///
/// Addresses order by zoom, then x, then y, then `cross_extent`, so they can key ordered maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
	pub zoom: u8,
	pub x: i32,
	pub y: i32,
	/// `-1` or `1` if the tile was produced by wrapping past the west or east edge of the world.
	pub cross_extent: i8,
}

impl TileAddress {
	#[must_use]
	pub fn new(zoom: u8, x: i32, y: i32) -> TileAddress {
		TileAddress {
			zoom,
			x,
			y,
			cross_extent: 0,
		}
	}

	/// Creates an address and checks that it lies inside the grid of its zoom level.
	///
	/// # Errors
	/// Returns an error if `zoom` is above [`MAX_ZOOM`] or an index is outside `[0, 2^zoom)`.
	pub fn new_checked(zoom: u8, x: i32, y: i32) -> Result<TileAddress> {
		ensure!(zoom <= MAX_ZOOM, "zoom ({zoom}) must be <= {MAX_ZOOM}");
		let max = 1i64 << zoom;
		ensure!((0..max).contains(&i64::from(x)), "x ({x}) out of bounds for zoom {zoom}");
		ensure!((0..max).contains(&i64::from(y)), "y ({y}) out of bounds for zoom {zoom}");
		Ok(TileAddress::new(zoom, x, y))
	}

	#[must_use]
	pub fn with_cross_extent(mut self, cross_extent: i8) -> TileAddress {
		self.cross_extent = cross_extent;
		self
	}

	/// The same tile without the wrap marker. Persisted rows are keyed by canonical addresses.
	#[must_use]
	pub fn canonical(&self) -> TileAddress {
		TileAddress::new(self.zoom, self.x, self.y)
	}

	#[must_use]
	pub fn is_wrapped(&self) -> bool {
		self.cross_extent != 0
	}

	/// Number of tiles per axis at this zoom level.
	#[must_use]
	pub fn tiles_in_dim(&self) -> i64 {
		1i64 << self.zoom
	}

	/// The column index before folding, i.e. `x + cross_extent * 2^zoom`.
	#[must_use]
	pub fn unwrapped_x(&self) -> i64 {
		i64::from(self.x) + i64::from(self.cross_extent) * self.tiles_in_dim()
	}
}

impl Debug for TileAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.cross_extent == 0 {
			write!(f, "TileAddress({}, [{}, {}])", self.zoom, self.x, self.y)
		} else {
			write!(
				f,
				"TileAddress({}, [{}, {}], cross {})",
				self.zoom, self.x, self.y, self.cross_extent
			)
		}
	}
}
