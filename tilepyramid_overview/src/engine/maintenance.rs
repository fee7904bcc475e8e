//! Incremental maintenance: keeps cached tiles in sync with single-feature edits.
//!
//! Every touched tile is read, stripped of the edited feature's items, given the new items
//! and written back. Tiles that end up empty are deleted instead of stored.
//!
//! Edits that arrive while a rebuild is running are queued and applied once the rebuild has
//! finished. A cache that cannot be updated completely is discarded, so lookups fall back to
//! computing tiles until the next rebuild.

use super::{OverviewEngine, OverviewState};
use crate::{Feature, FeatureListener, OverviewRow, TileTable, tiling::FeatureTiles};
use anyhow::{Context, Result};
use tilepyramid_core::Envelope;
use tilepyramid_geometry::VectorTile;

/// An edit received during a rebuild.
pub(super) enum PendingEdit {
	Replace {
		feature_id: i64,
		new: Option<Feature>,
		driving: Envelope,
	},
	DeleteAll,
}

impl OverviewEngine {
	/// Where an edit goes in the current state.
	fn edit_target(&self) -> EditTarget {
		match self.state() {
			OverviewState::Building => EditTarget::Queue,
			OverviewState::NoOverview => EditTarget::Skip,
			// bulk imports are followed by a forced rebuild
			OverviewState::Ready if self.host.is_batch_operation() => EditTarget::Skip,
			OverviewState::Ready => EditTarget::Apply,
		}
	}

	/// Replaces the items of `feature_id` in all tiles touched by `driving` with the items of
	/// `new`.
	fn replace_feature(&self, feature_id: i64, new: Option<&Feature>, driving: &Envelope) -> Result<()> {
		let mut pending = self.maintenance_lock.lock();
		match self.edit_target() {
			EditTarget::Queue => {
				log::trace!("queueing edit of feature {feature_id} until the rebuild has finished");
				pending.push(PendingEdit::Replace {
					feature_id,
					new: new.cloned(),
					driving: *driving,
				});
				Ok(())
			}
			EditTarget::Skip => Ok(()),
			EditTarget::Apply => self.apply_replace(feature_id, new, driving),
		}
	}

	/// Empties the cache by recreating the table.
	fn recreate_table(&self) -> Result<()> {
		let mut pending = self.maintenance_lock.lock();
		match self.edit_target() {
			EditTarget::Queue => {
				pending.clear();
				pending.push(PendingEdit::DeleteAll);
				Ok(())
			}
			EditTarget::Skip => Ok(()),
			EditTarget::Apply => self.apply_recreate(),
		}
	}

	/// Applies the edits queued during a rebuild, in order. The caller holds the maintenance
	/// lock and has set the final state.
	pub(super) fn replay_edits(&self, edits: Vec<PendingEdit>) -> Result<()> {
		if edits.is_empty() || self.state() != OverviewState::Ready {
			return Ok(());
		}
		log::debug!("applying {} edits received during the rebuild of {}", edits.len(), self.table_name);
		for edit in edits {
			match edit {
				PendingEdit::Replace {
					feature_id,
					new,
					driving,
				} => self.apply_replace(feature_id, new.as_ref(), &driving)?,
				PendingEdit::DeleteAll => self.apply_recreate()?,
			}
		}
		Ok(())
	}

	fn apply_replace(&self, feature_id: i64, new: Option<&Feature>, driving: &Envelope) -> Result<()> {
		let Some(table) = self.table()? else {
			return Ok(());
		};

		let tiler = self.tiler(&self.zoom_levels());
		let tiles: FeatureTiles = match new.and_then(|f| f.geometry.as_ref()) {
			Some(geometry) => tiler.tile_geometry(feature_id, geometry, driving).unwrap_or_else(|error| {
				log::warn!("cannot tile feature {feature_id}, removing it from the overviews: {error:#}");
				tiler.touched_tiles(driving)
			}),
			None => tiler.touched_tiles(driving),
		};

		let _execute = self.lock_execute()?;
		self.write_feature_tiles(table.as_ref(), feature_id, tiles).inspect_err(|error| self.invalidate(error))
	}

	fn write_feature_tiles(&self, table: &dyn TileTable, feature_id: i64, tiles: FeatureTiles) -> Result<()> {
		for (address, items) in tiles {
			let existing = table.read(address.zoom, address.x, address.y)?;
			if existing.is_none() && items.is_empty() {
				continue;
			}

			let mut tile = match &existing {
				Some(blob) => VectorTile::from_blob(blob).unwrap_or_else(|error| {
					log::warn!("replacing unreadable tile {address:?}: {error:#}");
					VectorTile::new()
				}),
				None => VectorTile::new(),
			};
			tile.remove(feature_id);
			tile.add(items, false);

			if tile.is_empty() {
				if existing.is_some() {
					table.delete(address.zoom, address.x, address.y)?;
					log::trace!("deleted empty tile {address:?}");
				}
			} else {
				let data = tile.to_blob().with_context(|| format!("Failed to encode tile {address:?}"))?;
				table.upsert(&OverviewRow::new(address.zoom, address.x, address.y, data))?;
				log::trace!("updated tile {address:?}");
			}
		}
		Ok(())
	}

	fn apply_recreate(&self) -> Result<()> {
		let _execute = self.lock_execute()?;
		log::debug!("recreating {}", self.table_name);
		let recreated = self
			.host
			.drop_overview_table(&self.table_name)
			.and_then(|_| self.host.create_overview_table(&self.table_name))
			.and_then(|table| {
				self.host.create_overview_index(&self.table_name)?;
				Ok(table)
			});
		match recreated {
			Ok(table) => {
				*self.table.write() = Some(table);
				Ok(())
			}
			Err(error) => {
				self.invalidate(&error);
				Err(error)
			}
		}
	}

	/// Discards a cache that is no longer in sync with the features. The caller holds the
	/// execute lock.
	fn invalidate(&self, error: &anyhow::Error) {
		log::warn!("discarding {} after a failed update: {error:#}", self.table_name);
		self.state.set(OverviewState::NoOverview);
		*self.table.write() = None;
		if let Err(drop_error) = self.host.drop_overview_table(&self.table_name) {
			log::warn!("cannot drop {}: {drop_error:#}", self.table_name);
		}
	}
}

enum EditTarget {
	Queue,
	Apply,
	Skip,
}

impl FeatureListener for OverviewEngine {
	fn on_feature_inserted(&self, feature: &Feature) -> Result<()> {
		let Some(envelope) = feature.envelope() else {
			return Ok(());
		};
		self.replace_feature(feature.id, Some(feature), &envelope)
	}

	fn on_feature_updated(&self, old: &Feature, new: &Feature) -> Result<()> {
		let driving = match (old.envelope(), new.envelope()) {
			(Some(a), Some(b)) => a.merged(&b),
			(Some(e), None) | (None, Some(e)) => e,
			(None, None) => return Ok(()),
		};
		if old.id != new.id {
			self.replace_feature(old.id, None, &driving)?;
		}
		self.replace_feature(new.id, Some(new), &driving)
	}

	fn on_feature_deleted(&self, feature: &Feature) -> Result<()> {
		let Some(envelope) = feature.envelope() else {
			return Ok(());
		};
		self.replace_feature(feature.id, None, &envelope)
	}

	fn on_features_deleted(&self) -> Result<()> {
		self.recreate_table()
	}
}
