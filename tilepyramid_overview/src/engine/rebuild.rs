use super::{OverviewEngine, OverviewState, ZOOM_LEVELS_PROPERTY};
use crate::{FeatureQuery, OverviewError, OverviewOptions, OverviewRow, tiling::TilingPool};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, sync::Arc};
use tilepyramid_core::{
	TileAddress, ZoomSet,
	progress::{Progress, ProgressStatus},
};
use tilepyramid_geometry::VectorTile;

/// What [`OverviewEngine::create_overviews`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebuildOutcome {
	/// Nothing to do: no zoom levels, or a cache exists and the rebuild was not forced.
	Skipped,
	/// Cancelled through the progress callback. The previous cache is untouched.
	Cancelled,
	Completed {
		features: u64,
		skipped_features: u64,
		failed_features: u64,
		tiles: u64,
	},
}

impl OverviewEngine {
	/// Builds the overview cache.
	///
	/// Zoom levels come from the options or, if absent, from the persisted set. An existing
	/// cache is only rebuilt with `FORCE`.
	///
	/// Progress runs through two steps: tiling all features, then saving the tiles. Success is
	/// reported as [`ProgressStatus::Finished`], errors as [`ProgressStatus::CreateFailed`].
	/// The previous cache stays intact unless the rebuild succeeds.
	///
	/// # Errors
	/// Returns a configuration error if the host cannot store overviews, and storage errors
	/// raised while reading features or writing tiles.
	pub fn create_overviews(&self, options: &OverviewOptions, progress: &Progress) -> Result<RebuildOutcome> {
		let zoom_levels = options.zoom_levels.clone().unwrap_or_else(|| self.zoom_levels());
		if zoom_levels.is_empty() {
			log::debug!("no zoom levels for {}, nothing to build", self.table_name);
			return Ok(RebuildOutcome::Skipped);
		}
		if !options.force && self.has_overviews() {
			log::debug!("{} exists and rebuild is not forced", self.table_name);
			return Ok(RebuildOutcome::Skipped);
		}

		let result = self.rebuild(&zoom_levels, progress);
		match &result {
			Ok(RebuildOutcome::Completed { .. }) => {
				progress.on_progress(ProgressStatus::Finished, 1.0, "overviews created");
			}
			Ok(_) => {}
			Err(error) => {
				progress.on_progress(ProgressStatus::CreateFailed, 0.0, &format!("{error:#}"));
			}
		}
		result
	}

	/// Completes a bulk import: rebuilds the cache if `CREATE_OVERVIEWS` is set.
	///
	/// Incremental maintenance is suspended while the host is in a batch, so the rebuild is
	/// always forced.
	pub fn on_rows_copied(&self, options: &OverviewOptions, progress: &Progress) -> Result<RebuildOutcome> {
		if !options.create_overviews {
			return Ok(RebuildOutcome::Skipped);
		}
		self.create_overviews(&options.clone().with_force(true), progress)
	}

	fn rebuild(&self, zoom_levels: &ZoomSet, progress: &Progress) -> Result<RebuildOutcome> {
		if !self.host.supports_overviews() {
			return Err(OverviewError::Configuration(format!(
				"the container of {} does not support overviews",
				self.source.name()
			))
			.into());
		}

		{
			// in-flight incremental updates finish first, later ones are queued
			let mut pending = self.maintenance_lock.lock();
			self.state.begin_building()?;
			pending.clear();
		}

		let result = self.build_and_save(zoom_levels, progress);

		let mut pending = self.maintenance_lock.lock();
		if matches!(result, Ok(RebuildOutcome::Completed { .. })) {
			self.state.set(OverviewState::Ready);
		} else if let Err(error) = self.refresh_state() {
			log::warn!("cannot restore state of {}: {error:#}", self.table_name);
			self.state.set(OverviewState::NoOverview);
		}
		let edits = std::mem::take(&mut *pending);
		self
			.replay_edits(edits)
			.context("Failed to apply the edits received during the rebuild")?;
		result
	}

	fn build_and_save(&self, zoom_levels: &ZoomSet, progress: &Progress) -> Result<RebuildOutcome> {
		log::debug!("building {} for zoom levels {zoom_levels}", self.table_name);
		let mut progress = progress.clone();
		progress.set_total_steps(2);
		progress.set_step(0);

		let tiler = self.tiler(zoom_levels);
		let pool = TilingPool::new(
			self.config.threads,
			self.config.job_retries,
			self.config.accumulation_timeout(),
		);
		let total = self.source.feature_count()?;
		let query = FeatureQuery::geometry_only(None);
		let Some(report) = pool.run(&tiler, total, |sink| self.scan(&query, sink), &progress)? else {
			log::debug!("building {} cancelled", self.table_name);
			return Ok(RebuildOutcome::Cancelled);
		};

		progress.set_step(1);
		let tiles = self
			.save(&report.tiles, &progress)
			.map_err(|e| OverviewError::storage(&format!("saving {}", self.table_name), &e))?;

		self
			.source
			.set_property(ZOOM_LEVELS_PROPERTY, &zoom_levels.to_string())
			.map_err(|e| OverviewError::storage("saving zoom levels", &e))?;
		*self.zoom_levels.write() = zoom_levels.clone();

		log::debug!("built {} with {tiles} tiles", self.table_name);
		Ok(RebuildOutcome::Completed {
			features: report.features,
			skipped_features: report.skipped_features,
			failed_features: report.failed_features,
			tiles,
		})
	}

	/// Replaces the table content with `tiles` in one batch and rebuilds the index.
	fn save(&self, tiles: &BTreeMap<TileAddress, VectorTile>, progress: &Progress) -> Result<u64> {
		let _execute = self.lock_execute()?;
		self.host.begin_batch().context("Failed to begin batch")?;

		let written = match self.write_rows(tiles, progress) {
			Ok(written) => written,
			Err(error) => {
				if let Err(abort_error) = self.host.abort_batch() {
					log::warn!("cannot abort batch: {abort_error:#}");
				}
				return Err(error);
			}
		};
		if let Err(error) = self.host.create_overview_index(&self.table_name) {
			log::warn!("cannot index {}: {error:#}", self.table_name);
		}
		Ok(written)
	}

	fn write_rows(&self, tiles: &BTreeMap<TileAddress, VectorTile>, progress: &Progress) -> Result<u64> {
		self.host.drop_overview_index(&self.table_name)?;
		let table = self.host.create_overview_table(&self.table_name)?;
		table.clear()?;
		*self.table.write() = Some(Arc::clone(&table));

		let total = tiles.len().max(1) as f64;
		let mut written = 0u64;
		for (index, (address, tile)) in tiles.iter().enumerate() {
			if !tile.is_empty() {
				let data = tile.to_blob().with_context(|| format!("Failed to encode tile {address:?}"))?;
				table.insert(&OverviewRow::new(address.zoom, address.x, address.y, data))?;
				written += 1;
				log::trace!("saved tile {address:?}");
			}
			if index % 256 == 255 {
				progress.on_progress(ProgressStatus::InProcess, (index + 1) as f64 / total, "saving tiles");
			}
		}
		self.host.end_batch().context("Failed to commit batch")?;
		progress.on_progress(ProgressStatus::InProcess, 1.0, "saving tiles");
		Ok(written)
	}
}
