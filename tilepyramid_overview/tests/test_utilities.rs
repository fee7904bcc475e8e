#![allow(unused)]

use anyhow::{Result, bail};
use geo::{LineString, Point, polygon};
use std::{
	collections::BTreeMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
use tilepyramid_core::{Blob, TileAddress, ZoomSet, progress::Progress, tile_size};
use tilepyramid_geometry::{Geometry, GeometryKind, VectorTile};
use tilepyramid_overview::*;

/// A feature class with an engine subscribed to it, stored in a [`MemoryHost`].
pub struct Fixture {
	pub class: Arc<MemoryFeatureClass>,
	pub host: Arc<MemoryHost>,
	pub engine: Arc<OverviewEngine>,
}

impl Fixture {
	pub fn new(kind: GeometryKind) -> Fixture {
		Fixture::with_host(kind, MemoryHost::new())
	}

	pub fn with_host(kind: GeometryKind, host: MemoryHost) -> Fixture {
		let class = Arc::new(MemoryFeatureClass::new("features", kind));
		let host = Arc::new(host);
		let engine = Arc::new(OverviewEngine::new(class.clone(), host.clone(), test_config()).unwrap());
		class.subscribe(&engine);
		Fixture { class, host, engine }
	}

	/// Builds the overviews for `zooms` with `FORCE`.
	pub fn build(&self, zooms: &str) -> RebuildOutcome {
		let options = OverviewOptions::new()
			.with_zoom_levels(ZoomSet::parse(zooms).unwrap())
			.with_force(true);
		self.engine.create_overviews(&options, &Progress::silent()).unwrap()
	}

	pub fn insert(&self, geometry: Geometry) -> i64 {
		self.class.insert_feature(Some(geometry), BTreeMap::new()).unwrap()
	}

	pub fn rows(&self) -> BTreeMap<TileAddress, VectorTile> {
		cached_tiles(&self.host, self.engine.table_name())
	}
}

pub fn test_config() -> OverviewConfig {
	OverviewConfig {
		threads: 2,
		..OverviewConfig::default()
	}
}

/// All rows of a table in a [`MemoryHost`], decoded.
pub fn cached_tiles(host: &MemoryHost, table_name: &str) -> BTreeMap<TileAddress, VectorTile> {
	let Some(table) = host.table(table_name) else {
		return BTreeMap::new();
	};
	table
		.keys()
		.into_iter()
		.map(|(zoom, x, y)| {
			let blob = table.read(zoom, x, y).unwrap().unwrap();
			(TileAddress::new(zoom, x, y), VectorTile::from_blob(&blob).unwrap())
		})
		.collect()
}

pub fn point(x: f64, y: f64) -> Geometry {
	Point::new(x, y).into()
}

pub fn line(coords: &[(f64, f64)]) -> Geometry {
	LineString::from(coords.to_vec()).into()
}

/// An axis-aligned square with its lower left corner at `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Geometry {
	polygon![
		(x: x, y: y),
		(x: x + size, y: y),
		(x: x + size, y: y + size),
		(x: x, y: y + size),
	]
	.into()
}

/// A square well inside the tile `(zoom, x, y)`.
pub fn square_in_tile(zoom: u8, x: i64, y: i64) -> Geometry {
	let envelope = tilepyramid_core::tile_envelope(zoom, x, y);
	let size = tile_size(zoom);
	square(envelope.min_x + 0.3 * size, envelope.min_y + 0.3 * size, 0.4 * size)
}

/// A mix of points, lines and polygons spread over the world, including some near the
/// horizontal world edges.
pub fn sample_geometries() -> Vec<Geometry> {
	let edge = tilepyramid_core::WORLD_MAX;
	vec![
		point(5.0e6, 5.0e6),
		point(-1.2e7, 3.0e6),
		point(edge - 1.0e5, -2.0e6),
		line(&[(-1.5e7, -1.5e7), (-2.0e6, 1.0e6), (8.0e6, -4.0e6)]),
		line(&[(-edge + 5.0e4, 1.0e7), (-edge + 3.0e6, 1.2e7)]),
		square(1.0e6, 1.0e6, 3.0e6),
		square(-9.0e6, -9.0e6, 1.5e7),
		square(edge - 2.0e6, 4.0e6, 1.9e6),
	]
}

/// Remaining successful writes of one kind; fails once it reaches zero.
#[derive(Clone)]
struct WriteBudget(Arc<AtomicUsize>);

impl WriteBudget {
	fn unlimited() -> WriteBudget {
		WriteBudget(Arc::new(AtomicUsize::new(usize::MAX)))
	}

	fn take(&self) -> Result<()> {
		if self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_err() {
			bail!("disk full");
		}
		Ok(())
	}
}

/// Delegates to a [`MemoryHost`], but fails inserts or upserts after a number of rows.
pub struct FailingHost {
	pub inner: MemoryHost,
	inserts: WriteBudget,
	upserts: WriteBudget,
}

impl FailingHost {
	pub fn new() -> FailingHost {
		FailingHost {
			inner: MemoryHost::new(),
			inserts: WriteBudget::unlimited(),
			upserts: WriteBudget::unlimited(),
		}
	}

	pub fn fail_inserts_after(&self, rows: usize) {
		self.inserts.0.store(rows, Ordering::SeqCst);
	}

	pub fn fail_upserts_after(&self, rows: usize) {
		self.upserts.0.store(rows, Ordering::SeqCst);
	}

	fn wrap(&self, inner: Arc<dyn TileTable>) -> Arc<dyn TileTable> {
		Arc::new(FailingTable {
			inner,
			inserts: self.inserts.clone(),
			upserts: self.upserts.clone(),
		})
	}
}

struct FailingTable {
	inner: Arc<dyn TileTable>,
	inserts: WriteBudget,
	upserts: WriteBudget,
}

impl TileTable for FailingTable {
	fn name(&self) -> &str {
		self.inner.name()
	}
	fn read(&self, zoom: u8, x: i32, y: i32) -> Result<Option<Blob>> {
		self.inner.read(zoom, x, y)
	}
	fn upsert(&self, row: &OverviewRow) -> Result<()> {
		self.upserts.take()?;
		self.inner.upsert(row)
	}
	fn insert(&self, row: &OverviewRow) -> Result<()> {
		self.inserts.take()?;
		self.inner.insert(row)
	}
	fn delete(&self, zoom: u8, x: i32, y: i32) -> Result<bool> {
		self.inner.delete(zoom, x, y)
	}
	fn count(&self) -> Result<u64> {
		self.inner.count()
	}
	fn clear(&self) -> Result<()> {
		self.inner.clear()
	}
}

impl OverviewHost for FailingHost {
	fn kind(&self) -> ContainerKind {
		self.inner.kind()
	}
	fn open_overview_table(&self, name: &str) -> Result<Option<Arc<dyn TileTable>>> {
		Ok(self.inner.open_overview_table(name)?.map(|table| self.wrap(table)))
	}
	fn create_overview_table(&self, name: &str) -> Result<Arc<dyn TileTable>> {
		Ok(self.wrap(self.inner.create_overview_table(name)?))
	}
	fn drop_overview_table(&self, name: &str) -> Result<bool> {
		self.inner.drop_overview_table(name)
	}
	fn create_overview_index(&self, name: &str) -> Result<()> {
		self.inner.create_overview_index(name)
	}
	fn drop_overview_index(&self, name: &str) -> Result<()> {
		self.inner.drop_overview_index(name)
	}
	fn begin_batch(&self) -> Result<()> {
		self.inner.begin_batch()
	}
	fn end_batch(&self) -> Result<()> {
		self.inner.end_batch()
	}
	fn abort_batch(&self) -> Result<()> {
		self.inner.abort_batch()
	}
	fn is_batch_operation(&self) -> bool {
		self.inner.is_batch_operation()
	}
	fn execute_lock(&self) -> &parking_lot::Mutex<()> {
		self.inner.execute_lock()
	}
	fn destroy_feature_class(&self, name: &str) -> Result<()> {
		self.inner.destroy_feature_class(name)
	}
	fn destroy(&self) -> Result<()> {
		self.inner.destroy()
	}
}
