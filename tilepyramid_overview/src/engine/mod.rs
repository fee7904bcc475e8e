//! The [`OverviewEngine`]: bulk rebuild, incremental maintenance and cache-or-compute lookup
//! for the overview tiles of one feature class.
//!
//! The engine is bound to one [`FeatureSource`] and the [`OverviewHost`] that stores it. Its
//! tiles live in the table `<class name>_overviews`; the materialized zoom levels are kept in
//! the class property `zoom_levels`.
//!
//! To maintain the cache incrementally, subscribe the engine to the feature class, e.g. with
//! [`MemoryFeatureClass::subscribe`](crate::MemoryFeatureClass::subscribe).

mod lookup;
mod maintenance;
mod rebuild;
mod state;

pub use rebuild::*;
pub use state::OverviewState;

use crate::{
	ContainerKind, Feature, FeatureQuery, FeatureSource, OverviewConfig, OverviewError, OverviewHost, TileTable,
	tiling::FeatureTiler,
};
use anyhow::Result;
use parking_lot::{Mutex, MutexGuard, RwLock};
use maintenance::PendingEdit;
use state::StateCell;
use std::sync::Arc;
use tilepyramid_core::ZoomSet;
use tilepyramid_geometry::{GeoEngine, GeometryEngine};

/// Property key under which the materialized zoom set is persisted.
pub const ZOOM_LEVELS_PROPERTY: &str = "zoom_levels";

pub struct OverviewEngine {
	source: Arc<dyn FeatureSource>,
	host: Arc<dyn OverviewHost>,
	geometry: Arc<dyn GeometryEngine>,
	config: OverviewConfig,
	table_name: String,
	table: RwLock<Option<Arc<dyn TileTable>>>,
	zoom_levels: RwLock<ZoomSet>,
	state: StateCell,
	read_lock: Mutex<()>,
	/// Serializes incremental edits and holds the edits queued during a rebuild.
	maintenance_lock: Mutex<Vec<PendingEdit>>,
}

impl OverviewEngine {
	/// Binds an engine to a feature class, using [`GeoEngine`] for geometry operations.
	///
	/// # Errors
	/// Returns a configuration error if the class has no geometry column, or a storage error
	/// if an existing overview table cannot be opened.
	pub fn new(source: Arc<dyn FeatureSource>, host: Arc<dyn OverviewHost>, config: OverviewConfig) -> Result<OverviewEngine> {
		OverviewEngine::with_geometry_engine(source, host, Arc::new(GeoEngine), config)
	}

	pub fn with_geometry_engine(
		source: Arc<dyn FeatureSource>,
		host: Arc<dyn OverviewHost>,
		geometry: Arc<dyn GeometryEngine>,
		config: OverviewConfig,
	) -> Result<OverviewEngine> {
		if source.geometry_kind().is_none() {
			return Err(OverviewError::Configuration(format!("{} has no geometry column", source.name())).into());
		}

		let zoom_levels = match source.property(ZOOM_LEVELS_PROPERTY) {
			Some(text) => ZoomSet::parse(&text).unwrap_or_else(|error| {
				log::warn!("ignoring invalid zoom levels of {}: {error:#}", source.name());
				ZoomSet::new_empty()
			}),
			None => ZoomSet::new_empty(),
		};

		let engine = OverviewEngine {
			table_name: format!("{}_overviews", source.name()),
			source,
			host,
			geometry,
			config,
			table: RwLock::new(None),
			zoom_levels: RwLock::new(zoom_levels),
			state: StateCell::new(OverviewState::NoOverview),
			read_lock: Mutex::new(()),
			maintenance_lock: Mutex::new(Vec::new()),
		};
		engine.refresh_state()?;
		Ok(engine)
	}

	pub fn state(&self) -> OverviewState {
		self.state.get()
	}

	/// The materialized zoom levels.
	pub fn zoom_levels(&self) -> ZoomSet {
		self.zoom_levels.read().clone()
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	pub fn config(&self) -> &OverviewConfig {
		&self.config
	}

	/// Whether the overview table exists.
	pub fn has_overviews(&self) -> bool {
		match self.table() {
			Ok(table) => table.is_some(),
			Err(error) => {
				log::warn!("cannot open {}: {error:#}", self.table_name);
				false
			}
		}
	}

	/// Destroys the feature class and its overviews.
	///
	/// In a [`ContainerKind::Simple`] container this destroys the container. Otherwise the
	/// class is removed first and the overview table dropped afterwards on a best-effort basis.
	pub fn destroy(&self) -> Result<()> {
		let mut pending = self.maintenance_lock.lock();
		let _execute = self.lock_execute()?;
		pending.clear();
		if self.host.kind() == ContainerKind::Simple {
			self.host.destroy()?;
		} else {
			self.host.destroy_feature_class(self.source.name())?;
			match self.host.drop_overview_table(&self.table_name) {
				Ok(true) => log::debug!("dropped {}", self.table_name),
				Ok(false) => {}
				Err(error) => log::warn!("cannot drop {}: {error:#}", self.table_name),
			}
		}
		*self.table.write() = None;
		self.state.set(OverviewState::NoOverview);
		Ok(())
	}

	/// The overview table, opened lazily and cached once it exists.
	fn table(&self) -> Result<Option<Arc<dyn TileTable>>> {
		if let Some(table) = self.table.read().as_ref() {
			return Ok(Some(Arc::clone(table)));
		}
		if !self.host.supports_overviews() {
			return Ok(None);
		}
		let table = self
			.host
			.open_overview_table(&self.table_name)
			.map_err(|e| OverviewError::storage(&format!("opening {}", self.table_name), &e))?;
		if let Some(table) = &table {
			*self.table.write() = Some(Arc::clone(table));
		}
		Ok(table)
	}

	/// Re-reads the table handle and derives the state from storage: ready if the table exists
	/// and zoom levels are known.
	fn refresh_state(&self) -> Result<()> {
		*self.table.write() = None;
		let ready = self.table()?.is_some() && !self.zoom_levels.read().is_empty();
		self.state.set(if ready {
			OverviewState::Ready
		} else {
			OverviewState::NoOverview
		});
		Ok(())
	}

	fn lock_execute(&self) -> Result<MutexGuard<'_, ()>> {
		let timeout = self.config.execute_timeout();
		self.host.execute_lock().try_lock_for(timeout).ok_or_else(|| {
			OverviewError::ConcurrencyTimeout {
				what: "execute lock",
				timeout,
			}
			.into()
		})
	}

	/// Runs one scan of the source under the execute lock.
	fn scan(&self, query: &FeatureQuery, sink: &mut dyn FnMut(Feature) -> bool) -> Result<()> {
		let _execute = self.lock_execute()?;
		for feature in self.source.features(query)? {
			if !sink(feature) {
				break;
			}
		}
		Ok(())
	}

	fn tiler(&self, zoom_levels: &ZoomSet) -> FeatureTiler {
		FeatureTiler::new(Arc::clone(&self.geometry), zoom_levels, self.config.tile_size)
	}
}
