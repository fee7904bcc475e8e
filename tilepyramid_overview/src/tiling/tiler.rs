use super::{feature_tiles, tolerance};
use crate::{Feature, OverviewError};
use anyhow::Result;
use std::{collections::BTreeMap, sync::Arc};
use tilepyramid_core::{Envelope, TileAddress, ZoomSet, tile_envelope};
use tilepyramid_geometry::{Geometry, GeometryEngine, GeometryKind, VectorTileItem, tile_geometry};

/// Items of one feature per canonical tile address.
///
/// Every tile touched by the driving envelope is present, possibly with no items.
pub type FeatureTiles = BTreeMap<TileAddress, Vec<VectorTileItem>>;

/// Tiles single features for a set of zoom levels.
///
/// Bulk rebuild, incremental maintenance and on-the-fly lookup all go through this type,
/// so they produce identical items for the same feature.
#[derive(Clone)]
pub struct FeatureTiler {
	engine: Arc<dyn GeometryEngine>,
	zooms: Vec<u8>,
	base_tile_size: u16,
}

impl FeatureTiler {
	#[must_use]
	pub fn new(engine: Arc<dyn GeometryEngine>, zooms: &ZoomSet, base_tile_size: u16) -> FeatureTiler {
		FeatureTiler {
			engine,
			zooms: zooms.iter_fine_to_coarse().collect(),
			base_tile_size,
		}
	}

	/// Zoom levels from finest to coarsest.
	pub fn zooms(&self) -> &[u8] {
		&self.zooms
	}

	fn simplify(&self, geometry: &Geometry, zoom: u8) -> Geometry {
		let precise = GeometryKind::of(geometry).is_precise();
		self
			.engine
			.simplify(geometry, tolerance(zoom, precise, self.base_tile_size))
	}

	/// Tiles a feature at all zoom levels, driven by its own envelope.
	///
	/// # Errors
	/// Returns a geometry error if a part of the feature cannot be encoded.
	pub fn tile_feature(&self, feature: &Feature) -> Result<FeatureTiles> {
		match (&feature.geometry, feature.envelope()) {
			(Some(geometry), Some(envelope)) => self.tile_geometry(feature.id, geometry, &envelope),
			_ => Ok(FeatureTiles::new()),
		}
	}

	/// Tiles a geometry at all zoom levels. The touched tiles are those of `driving`, which
	/// may be larger than the geometry's own envelope.
	///
	/// # Errors
	/// Returns a geometry error if a part of the geometry cannot be encoded.
	pub fn tile_geometry(&self, feature_id: i64, geometry: &Geometry, driving: &Envelope) -> Result<FeatureTiles> {
		let mut tiles = FeatureTiles::new();
		for &zoom in &self.zooms {
			let simplified = self.simplify(geometry, zoom);
			for extent in feature_tiles(zoom, driving) {
				let items = tile_geometry(self.engine.as_ref(), feature_id, &simplified, &extent.envelope).map_err(|e| {
					OverviewError::Geometry {
						feature_id,
						reason: format!("{e:#}"),
					}
				})?;
				tiles.entry(extent.address.canonical()).or_default().extend(items);
			}
		}
		Ok(tiles)
	}

	/// The canonical tiles touched by `driving` at all zoom levels, without items.
	#[must_use]
	pub fn touched_tiles(&self, driving: &Envelope) -> FeatureTiles {
		let mut tiles = FeatureTiles::new();
		for &zoom in &self.zooms {
			for extent in feature_tiles(zoom, driving) {
				tiles.entry(extent.address.canonical()).or_default();
			}
		}
		tiles
	}

	/// Items of a geometry for the tile with unwrapped column `x`, at any zoom level.
	///
	/// # Errors
	/// Returns a geometry error if a part of the geometry cannot be encoded.
	pub fn tile_single(&self, feature_id: i64, geometry: &Geometry, zoom: u8, x: i64, y: i64) -> Result<Vec<VectorTileItem>> {
		let simplified = self.simplify(geometry, zoom);
		let items = tile_geometry(self.engine.as_ref(), feature_id, &simplified, &tile_envelope(zoom, x, y)).map_err(
			|e| OverviewError::Geometry {
				feature_id,
				reason: format!("{e:#}"),
			},
		)?;
		Ok(items)
	}
}
