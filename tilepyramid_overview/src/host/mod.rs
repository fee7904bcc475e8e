//! The storage side of the overview engine.
//!
//! An [`OverviewHost`] is the store that owns a feature class. It creates, opens and drops the
//! `(zoom, x, y)`-keyed [`TileTable`]s that hold serialized tiles, manages their index,
//! brackets bulk writes in a batch, and provides the execute lock that serializes all access
//! to the underlying storage.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tilepyramid_core::Blob;

/// One persisted tile: the serialized tile at a canonical `(zoom, x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct OverviewRow {
	pub zoom: u8,
	pub x: i32,
	pub y: i32,
	pub data: Blob,
}

impl OverviewRow {
	#[must_use]
	pub fn new(zoom: u8, x: i32, y: i32, data: Blob) -> OverviewRow {
		OverviewRow { zoom, x, y, data }
	}
}

/// What kind of container hosts the feature class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
	/// A store holding several feature classes and tables.
	Store,
	/// A container that consists of a single feature class. Destroying the class destroys it.
	Simple,
	/// A container that cannot hold overview tables.
	Unsupported,
}

/// A blob table keyed uniquely by `(zoom, x, y)`.
pub trait TileTable: Send + Sync {
	fn name(&self) -> &str;

	fn read(&self, zoom: u8, x: i32, y: i32) -> Result<Option<Blob>>;

	/// Creates the row or replaces its data.
	fn upsert(&self, row: &OverviewRow) -> Result<()>;

	/// Inserts a new row. Fails if the key already exists.
	fn insert(&self, row: &OverviewRow) -> Result<()>;

	/// Deletes a row. Returns `true` if it existed.
	fn delete(&self, zoom: u8, x: i32, y: i32) -> Result<bool>;

	fn count(&self) -> Result<u64>;

	/// Deletes all rows.
	fn clear(&self) -> Result<()>;
}

/// The capabilities the overview engine needs from the store owning a feature class.
pub trait OverviewHost: Send + Sync {
	fn kind(&self) -> ContainerKind;

	fn supports_overviews(&self) -> bool {
		self.kind() != ContainerKind::Unsupported
	}

	/// Opens an existing table. Returns `None` if it does not exist.
	fn open_overview_table(&self, name: &str) -> Result<Option<Arc<dyn TileTable>>>;

	/// Creates a table, or opens it if it already exists.
	fn create_overview_table(&self, name: &str) -> Result<Arc<dyn TileTable>>;

	/// Drops a table. Returns `false` if it did not exist.
	fn drop_overview_table(&self, name: &str) -> Result<bool>;

	fn create_overview_index(&self, name: &str) -> Result<()>;

	fn drop_overview_index(&self, name: &str) -> Result<()>;

	/// Starts a bulk write. Writes become visible on [`OverviewHost::end_batch`].
	fn begin_batch(&self) -> Result<()>;

	fn end_batch(&self) -> Result<()>;

	/// Discards all writes since [`OverviewHost::begin_batch`].
	fn abort_batch(&self) -> Result<()>;

	/// Whether a bulk write is in progress.
	fn is_batch_operation(&self) -> bool;

	/// Serializes access to the underlying storage. Held for one scan or statement at a time,
	/// never nested.
	fn execute_lock(&self) -> &Mutex<()>;

	/// Removes a feature class from the store.
	fn destroy_feature_class(&self, name: &str) -> Result<()>;

	/// Destroys the whole container.
	fn destroy(&self) -> Result<()>;
}
