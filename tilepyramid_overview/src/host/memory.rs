use super::{ContainerKind, OverviewHost, OverviewRow, TileTable};
use anyhow::{Result, bail, ensure};
use parking_lot::{Mutex, RwLock};
use std::{
	collections::{BTreeMap, BTreeSet},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
use tilepyramid_core::Blob;

type Rows = BTreeMap<(u8, i32, i32), Blob>;

/// An in-process tile table.
#[derive(Debug)]
pub struct MemoryTileTable {
	name: String,
	rows: RwLock<Rows>,
}

impl MemoryTileTable {
	fn new(name: &str) -> MemoryTileTable {
		MemoryTileTable {
			name: name.to_string(),
			rows: RwLock::new(Rows::new()),
		}
	}

	/// All keys in `(zoom, x, y)` order.
	pub fn keys(&self) -> Vec<(u8, i32, i32)> {
		self.rows.read().keys().copied().collect()
	}
}

impl TileTable for MemoryTileTable {
	fn name(&self) -> &str {
		&self.name
	}

	fn read(&self, zoom: u8, x: i32, y: i32) -> Result<Option<Blob>> {
		Ok(self.rows.read().get(&(zoom, x, y)).cloned())
	}

	fn upsert(&self, row: &OverviewRow) -> Result<()> {
		self.rows.write().insert((row.zoom, row.x, row.y), row.data.clone());
		Ok(())
	}

	fn insert(&self, row: &OverviewRow) -> Result<()> {
		let mut rows = self.rows.write();
		let key = (row.zoom, row.x, row.y);
		ensure!(
			!rows.contains_key(&key),
			"row ({}, {}, {}) already exists in {}",
			row.zoom,
			row.x,
			row.y,
			self.name
		);
		rows.insert(key, row.data.clone());
		Ok(())
	}

	fn delete(&self, zoom: u8, x: i32, y: i32) -> Result<bool> {
		Ok(self.rows.write().remove(&(zoom, x, y)).is_some())
	}

	fn count(&self) -> Result<u64> {
		Ok(self.rows.read().len() as u64)
	}

	fn clear(&self) -> Result<()> {
		self.rows.write().clear();
		Ok(())
	}
}

#[derive(Debug, Default)]
struct Snapshot {
	tables: BTreeMap<String, Rows>,
	indexes: BTreeSet<String>,
}

/// An in-process [`OverviewHost`].
///
/// Writes inside a batch are applied immediately and rolled back on
/// [`OverviewHost::abort_batch`], including tables created or dropped during the batch.
#[derive(Debug)]
pub struct MemoryHost {
	kind: ContainerKind,
	tables: RwLock<BTreeMap<String, Arc<MemoryTileTable>>>,
	indexes: RwLock<BTreeSet<String>>,
	batch: Mutex<Option<Snapshot>>,
	in_batch: AtomicBool,
	execute_lock: Mutex<()>,
	destroyed_classes: Mutex<Vec<String>>,
	destroyed: AtomicBool,
}

impl Default for MemoryHost {
	fn default() -> Self {
		MemoryHost::with_kind(ContainerKind::Store)
	}
}

impl MemoryHost {
	#[must_use]
	pub fn new() -> MemoryHost {
		MemoryHost::default()
	}

	#[must_use]
	pub fn with_kind(kind: ContainerKind) -> MemoryHost {
		MemoryHost {
			kind,
			tables: RwLock::new(BTreeMap::new()),
			indexes: RwLock::new(BTreeSet::new()),
			batch: Mutex::new(None),
			in_batch: AtomicBool::new(false),
			execute_lock: Mutex::new(()),
			destroyed_classes: Mutex::new(Vec::new()),
			destroyed: AtomicBool::new(false),
		}
	}

	/// Direct access to a table, for inspection.
	pub fn table(&self, name: &str) -> Option<Arc<MemoryTileTable>> {
		self.tables.read().get(name).cloned()
	}

	pub fn has_index(&self, name: &str) -> bool {
		self.indexes.read().contains(name)
	}

	pub fn destroyed_feature_classes(&self) -> Vec<String> {
		self.destroyed_classes.lock().clone()
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::Acquire)
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot {
			tables: self
				.tables
				.read()
				.iter()
				.map(|(name, table)| (name.clone(), table.rows.read().clone()))
				.collect(),
			indexes: self.indexes.read().clone(),
		}
	}

	fn restore(&self, snapshot: Snapshot) {
		let mut tables = self.tables.write();
		tables.retain(|name, _| snapshot.tables.contains_key(name));
		for (name, rows) in snapshot.tables {
			let table = tables
				.entry(name)
				.or_insert_with_key(|name| Arc::new(MemoryTileTable::new(name)));
			*table.rows.write() = rows;
		}
		*self.indexes.write() = snapshot.indexes;
	}

	fn ensure_alive(&self) -> Result<()> {
		ensure!(!self.is_destroyed(), "the container has been destroyed");
		Ok(())
	}
}

impl OverviewHost for MemoryHost {
	fn kind(&self) -> ContainerKind {
		self.kind
	}

	fn open_overview_table(&self, name: &str) -> Result<Option<Arc<dyn TileTable>>> {
		self.ensure_alive()?;
		Ok(self.table(name).map(|t| t as Arc<dyn TileTable>))
	}

	fn create_overview_table(&self, name: &str) -> Result<Arc<dyn TileTable>> {
		self.ensure_alive()?;
		if !self.supports_overviews() {
			bail!("container cannot hold tables");
		}
		let table: Arc<dyn TileTable> = self
			.tables
			.write()
			.entry(name.to_string())
			.or_insert_with_key(|name| Arc::new(MemoryTileTable::new(name)))
			.clone();
		Ok(table)
	}

	fn drop_overview_table(&self, name: &str) -> Result<bool> {
		self.ensure_alive()?;
		self.indexes.write().remove(name);
		Ok(self.tables.write().remove(name).is_some())
	}

	fn create_overview_index(&self, name: &str) -> Result<()> {
		ensure!(self.tables.read().contains_key(name), "no table {name} to index");
		self.indexes.write().insert(name.to_string());
		Ok(())
	}

	fn drop_overview_index(&self, name: &str) -> Result<()> {
		self.indexes.write().remove(name);
		Ok(())
	}

	fn begin_batch(&self) -> Result<()> {
		self.ensure_alive()?;
		let mut batch = self.batch.lock();
		ensure!(batch.is_none(), "a batch is already in progress");
		*batch = Some(self.snapshot());
		self.in_batch.store(true, Ordering::Release);
		Ok(())
	}

	fn end_batch(&self) -> Result<()> {
		let mut batch = self.batch.lock();
		ensure!(batch.take().is_some(), "no batch in progress");
		self.in_batch.store(false, Ordering::Release);
		Ok(())
	}

	fn abort_batch(&self) -> Result<()> {
		let mut batch = self.batch.lock();
		let Some(snapshot) = batch.take() else {
			bail!("no batch in progress");
		};
		self.restore(snapshot);
		self.in_batch.store(false, Ordering::Release);
		Ok(())
	}

	fn is_batch_operation(&self) -> bool {
		self.in_batch.load(Ordering::Acquire)
	}

	fn execute_lock(&self) -> &Mutex<()> {
		&self.execute_lock
	}

	fn destroy_feature_class(&self, name: &str) -> Result<()> {
		self.ensure_alive()?;
		self.destroyed_classes.lock().push(name.to_string());
		Ok(())
	}

	fn destroy(&self) -> Result<()> {
		self.tables.write().clear();
		self.indexes.write().clear();
		self.destroyed.store(true, Ordering::Release);
		Ok(())
	}
}
