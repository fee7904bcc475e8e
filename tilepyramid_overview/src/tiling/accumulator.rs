use super::FeatureTiles;
use crate::OverviewError;
use anyhow::Result;
use parking_lot::Mutex;
use std::{collections::BTreeMap, time::Duration};
use tilepyramid_core::TileAddress;
use tilepyramid_geometry::VectorTile;

/// The shared tile map of a bulk rebuild.
///
/// Only appending takes the lock. Waiting for it is bounded by a timeout.
#[derive(Debug)]
pub struct TileAccumulator {
	pub(super) tiles: Mutex<BTreeMap<TileAddress, VectorTile>>,
	timeout: Duration,
}

impl TileAccumulator {
	#[must_use]
	pub fn new(timeout: Duration) -> TileAccumulator {
		TileAccumulator {
			tiles: Mutex::new(BTreeMap::new()),
			timeout,
		}
	}

	/// Moves the items of one feature into the map, replacing earlier items of that feature.
	///
	/// On success `feature_tiles` is left empty. On timeout it is left untouched, so the
	/// call can be retried.
	///
	/// # Errors
	/// Returns [`OverviewError::ConcurrencyTimeout`] if the lock is not acquired in time.
	pub fn append(&self, feature_tiles: &mut FeatureTiles) -> Result<()> {
		let Some(mut tiles) = self.tiles.try_lock_for(self.timeout) else {
			return Err(OverviewError::ConcurrencyTimeout {
				what: "accumulation lock",
				timeout: self.timeout,
			}
			.into());
		};
		for (address, items) in std::mem::take(feature_tiles) {
			if items.is_empty() {
				continue;
			}
			tiles.entry(address).or_default().add(items, true);
		}
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.tiles.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.tiles.lock().is_empty()
	}

	/// The accumulated tiles in address order.
	#[must_use]
	pub fn into_tiles(self) -> BTreeMap<TileAddress, VectorTile> {
		self.tiles.into_inner()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilepyramid_geometry::{TileGeometryType, VectorTileItem};

	fn point(feature_id: i64) -> VectorTileItem {
		VectorTileItem::new(feature_id, TileGeometryType::Point, vec![[1.0, 1.0]])
	}

	#[test]
	fn merges_features_per_tile() -> Result<()> {
		let accumulator = TileAccumulator::new(Duration::from_secs(1));
		let a = TileAddress::new(1, 0, 0);
		let b = TileAddress::new(1, 1, 0);

		let mut first = FeatureTiles::from([(a, vec![point(2)]), (b, vec![])]);
		accumulator.append(&mut first)?;
		assert!(first.is_empty());
		let mut second = FeatureTiles::from([(a, vec![point(1)])]);
		accumulator.append(&mut second)?;

		let tiles = accumulator.into_tiles();
		assert_eq!(tiles.len(), 1);
		assert_eq!(tiles[&a].feature_ids().collect::<Vec<_>>(), vec![1, 2]);
		Ok(())
	}

	#[test]
	fn timeout_keeps_items() {
		let accumulator = TileAccumulator::new(Duration::from_millis(10));
		let _guard = accumulator.tiles.lock();
		let mut tiles = FeatureTiles::from([(TileAddress::new(0, 0, 0), vec![point(1)])]);
		let error = accumulator.append(&mut tiles).unwrap_err();
		assert!(matches!(
			error.downcast_ref::<OverviewError>(),
			Some(OverviewError::ConcurrencyTimeout { .. })
		));
		assert_eq!(tiles.len(), 1);
	}
}
