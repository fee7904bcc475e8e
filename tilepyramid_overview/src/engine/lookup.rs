use super::{OverviewEngine, OverviewState};
use crate::{FeatureQuery, OverviewError};
use anyhow::Result;
use tilepyramid_core::{Envelope, TILE_RESIZE, TileAddress, WORLD_BOUNDS, WORLD_WIDTH, ZoomSet, tile_envelope};
use tilepyramid_geometry::VectorTile;

impl OverviewEngine {
	/// Returns the tile at `address`, whose world envelope is `extent`.
	///
	/// Cached tiles are returned for materialized zoom levels. Other tiles are computed from
	/// the current features and never written to the cache. Wrapped addresses resolve to
	/// their canonical tile.
	///
	/// Never fails: errors are logged and yield an empty tile.
	pub fn get_tile(&self, address: TileAddress, extent: &Envelope) -> VectorTile {
		match self.try_get_tile(address, extent) {
			Ok(tile) => tile,
			Err(error) => {
				log::warn!("cannot get tile {address:?} of {}: {error:#}", self.table_name);
				VectorTile::new()
			}
		}
	}

	fn try_get_tile(&self, address: TileAddress, extent: &Envelope) -> Result<VectorTile> {
		let state = self.state();
		if state == OverviewState::Building {
			return Ok(VectorTile::new());
		}

		let canonical = address.canonical();
		let extent = extent.translated(-f64::from(address.cross_extent) * WORLD_WIDTH, 0.0);
		let Some(source_extent) = self.source.extent() else {
			return Ok(VectorTile::new());
		};
		let touches_source = [-WORLD_WIDTH, 0.0, WORLD_WIDTH]
			.iter()
			.any(|shift| source_extent.translated(*shift, 0.0).intersects(&extent));
		if !touches_source {
			return Ok(VectorTile::new());
		}

		if state == OverviewState::Ready && self.zoom_levels.read().contains(canonical.zoom) {
			return self.read_cached(canonical);
		}
		self.compute_tile(canonical)
	}

	fn read_cached(&self, address: TileAddress) -> Result<VectorTile> {
		let Some(table) = self.table()? else {
			return Ok(VectorTile::new());
		};
		let blob = {
			let _execute = self.lock_execute()?;
			table.read(address.zoom, address.x, address.y)?
		};
		let Some(blob) = blob else {
			return Ok(VectorTile::new());
		};
		Ok(VectorTile::from_blob(&blob).unwrap_or_else(|error| {
			log::warn!("ignoring unreadable tile {address:?} in {}: {error:#}", self.table_name);
			VectorTile::new()
		}))
	}

	/// Computes one canonical tile from the source, including the contributions that wrap
	/// around the world edges.
	fn compute_tile(&self, address: TileAddress) -> Result<VectorTile> {
		let timeout = self.config.read_timeout();
		let Some(_read) = self.read_lock.try_lock_for(timeout) else {
			return Err(OverviewError::ConcurrencyTimeout {
				what: "read lock",
				timeout,
			}
			.into());
		};

		let zoom = address.zoom;
		let tiler = self.tiler(&ZoomSet::from_levels([zoom])?);
		let n = address.tiles_in_dim();
		let wraps: &[i64] = if zoom == 0 { &[0] } else { &[-1, 0, 1] };

		let mut tile = VectorTile::new();
		for &wrap in wraps {
			let x = i64::from(address.x) + wrap * n;
			let y = i64::from(address.y);
			let buffered = tile_envelope(zoom, x, y).resized(TILE_RESIZE);
			if wrap != 0 && !buffered.intersects(&WORLD_BOUNDS) {
				continue;
			}

			let mut features = Vec::new();
			self.scan(&FeatureQuery::geometry_only(Some(buffered)), &mut |feature| {
				features.push(feature);
				true
			})?;

			for feature in features {
				let Some(geometry) = &feature.geometry else {
					continue;
				};
				match tiler.tile_single(feature.id, geometry, zoom, x, y) {
					Ok(items) => tile.add(items, false),
					Err(error) => log::warn!("skipping feature {}: {error:#}", feature.id),
				}
			}
		}
		log::trace!("computed tile {address:?} with {} items", tile.item_count());
		Ok(tile)
	}
}
