//! An [`OverviewHost`] backed by a SQLite database.
//!
//! Every overview table has the schema
//!
//! ```sql
//! CREATE TABLE "<name>" (
//!   zoom_level INTEGER NOT NULL, tile_column INTEGER NOT NULL, tile_row INTEGER NOT NULL,
//!   tile_data BLOB, UNIQUE (zoom_level, tile_column, tile_row));
//! CREATE INDEX "<name>_index" ON "<name>" (zoom_level, tile_column, tile_row);
//! ```
//!
//! A batch is one SQLite transaction. While it is open, all statements run on the
//! connection that owns the transaction.

use super::{ContainerKind, OverviewHost, OverviewRow, TileTable};
use crate::OverviewError;
use anyhow::{Context, Result, bail, ensure};
use parking_lot::Mutex;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{Connection, OptionalExtension, params},
};
use std::{
	path::Path,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};
use tilepyramid_core::Blob;

struct Shared {
	pool: Pool<SqliteConnectionManager>,
	batch: Mutex<Option<PooledConnection<SqliteConnectionManager>>>,
	in_batch: AtomicBool,
}

impl Shared {
	fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
		let batch = self.batch.lock();
		if let Some(connection) = batch.as_ref() {
			return f(connection);
		}
		drop(batch);
		let connection = self.pool.get().context("Failed to get a SQLite connection")?;
		f(&connection)
	}
}

fn check_name(name: &str) -> Result<()> {
	let valid = !name.is_empty()
		&& !name.starts_with(|c: char| c.is_ascii_digit())
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
	if !valid {
		return Err(OverviewError::Configuration(format!("'{name}' is not a valid table name")).into());
	}
	Ok(())
}

fn table_exists(connection: &Connection, name: &str) -> Result<bool> {
	let count: i64 = connection.query_row(
		"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
		[name],
		|row| row.get(0),
	)?;
	Ok(count > 0)
}

/// A tile table inside a [`SqliteHost`].
pub struct SqliteTileTable {
	name: String,
	shared: Arc<Shared>,
}

impl TileTable for SqliteTileTable {
	fn name(&self) -> &str {
		&self.name
	}

	fn read(&self, zoom: u8, x: i32, y: i32) -> Result<Option<Blob>> {
		self
			.shared
			.with_connection(|c| {
				let mut stmt = c.prepare_cached(&format!(
					"SELECT tile_data FROM \"{}\" WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
					self.name
				))?;
				let data = stmt
					.query_row(params![zoom, x, y], |row| row.get::<_, Option<Vec<u8>>>(0))
					.optional()?;
				Ok(data.map(|d| Blob::from(d.unwrap_or_default())))
			})
			.with_context(|| format!("Failed to read tile ({zoom}, {x}, {y}) from {}", self.name))
	}

	fn upsert(&self, row: &OverviewRow) -> Result<()> {
		self
			.shared
			.with_connection(|c| {
				c.prepare_cached(&format!(
					"INSERT INTO \"{}\" (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)
					ON CONFLICT (zoom_level, tile_column, tile_row) DO UPDATE SET tile_data = excluded.tile_data",
					self.name
				))?
				.execute(params![row.zoom, row.x, row.y, row.data.as_slice()])?;
				Ok(())
			})
			.with_context(|| format!("Failed to upsert tile ({}, {}, {}) into {}", row.zoom, row.x, row.y, self.name))
	}

	fn insert(&self, row: &OverviewRow) -> Result<()> {
		self
			.shared
			.with_connection(|c| {
				c.prepare_cached(&format!(
					"INSERT INTO \"{}\" (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
					self.name
				))?
				.execute(params![row.zoom, row.x, row.y, row.data.as_slice()])?;
				Ok(())
			})
			.with_context(|| format!("Failed to insert tile ({}, {}, {}) into {}", row.zoom, row.x, row.y, self.name))
	}

	fn delete(&self, zoom: u8, x: i32, y: i32) -> Result<bool> {
		self
			.shared
			.with_connection(|c| {
				let changed = c.execute(
					&format!(
						"DELETE FROM \"{}\" WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
						self.name
					),
					params![zoom, x, y],
				)?;
				Ok(changed > 0)
			})
			.with_context(|| format!("Failed to delete tile ({zoom}, {x}, {y}) from {}", self.name))
	}

	fn count(&self) -> Result<u64> {
		self.shared.with_connection(|c| {
			let count: i64 = c.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.name), [], |row| row.get(0))?;
			Ok(u64::try_from(count)?)
		})
	}

	fn clear(&self) -> Result<()> {
		self.shared.with_connection(|c| {
			c.execute(&format!("DELETE FROM \"{}\"", self.name), [])?;
			Ok(())
		})
	}
}

/// A SQLite database holding feature classes and their overview tables.
pub struct SqliteHost {
	kind: ContainerKind,
	shared: Arc<Shared>,
	execute_lock: Mutex<()>,
	destroyed: AtomicBool,
}

impl SqliteHost {
	/// Opens (or creates) the database at `path`.
	///
	/// # Errors
	/// Returns a storage error if the database cannot be opened.
	pub fn open(path: &Path, kind: ContainerKind) -> Result<SqliteHost> {
		log::debug!("open SQLite host {path:?}");
		let manager = SqliteConnectionManager::file(path).with_init(|c| c.busy_timeout(Duration::from_secs(5)));
		let pool = Pool::builder()
			.max_size(10)
			.build(manager)
			.map_err(|e| OverviewError::storage(&format!("opening {path:?}"), &anyhow::Error::from(e)))?;
		Ok(SqliteHost::from_pool(pool, kind))
	}

	/// Opens a private in-memory database. Uses a single connection, so every table lives in
	/// the same database.
	///
	/// # Errors
	/// Returns a storage error if the database cannot be created.
	pub fn open_in_memory(kind: ContainerKind) -> Result<SqliteHost> {
		let pool = Pool::builder()
			.max_size(1)
			.build(SqliteConnectionManager::memory())
			.map_err(|e| OverviewError::storage("opening in-memory database", &anyhow::Error::from(e)))?;
		Ok(SqliteHost::from_pool(pool, kind))
	}

	fn from_pool(pool: Pool<SqliteConnectionManager>, kind: ContainerKind) -> SqliteHost {
		SqliteHost {
			kind,
			shared: Arc::new(Shared {
				pool,
				batch: Mutex::new(None),
				in_batch: AtomicBool::new(false),
			}),
			execute_lock: Mutex::new(()),
			destroyed: AtomicBool::new(false),
		}
	}

	fn table(&self, name: &str) -> Arc<dyn TileTable> {
		Arc::new(SqliteTileTable {
			name: name.to_string(),
			shared: Arc::clone(&self.shared),
		})
	}

	/// Names of all tables in the database, sorted.
	pub fn table_names(&self) -> Result<Vec<String>> {
		self.shared.with_connection(|c| {
			let mut stmt = c.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
			let names = stmt
				.query_map([], |row| row.get::<_, String>(0))?
				.collect::<Result<Vec<_>, _>>()?;
			Ok(names)
		})
	}

	pub fn has_index(&self, table: &str) -> Result<bool> {
		self.shared.with_connection(|c| {
			let count: i64 = c.query_row(
				"SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
				[format!("{table}_index")],
				|row| row.get(0),
			)?;
			Ok(count > 0)
		})
	}

	fn ensure_alive(&self) -> Result<()> {
		ensure!(!self.destroyed.load(Ordering::Acquire), "the container has been destroyed");
		Ok(())
	}
}

impl OverviewHost for SqliteHost {
	fn kind(&self) -> ContainerKind {
		self.kind
	}

	fn open_overview_table(&self, name: &str) -> Result<Option<Arc<dyn TileTable>>> {
		self.ensure_alive()?;
		check_name(name)?;
		let exists = self.shared.with_connection(|c| table_exists(c, name))?;
		Ok(exists.then(|| self.table(name)))
	}

	fn create_overview_table(&self, name: &str) -> Result<Arc<dyn TileTable>> {
		self.ensure_alive()?;
		check_name(name)?;
		if !self.supports_overviews() {
			bail!("container cannot hold tables");
		}
		self
			.shared
			.with_connection(|c| {
				c.execute_batch(&format!(
					"CREATE TABLE IF NOT EXISTS \"{name}\" (zoom_level INTEGER NOT NULL, tile_column INTEGER NOT NULL, tile_row INTEGER NOT NULL, tile_data BLOB, UNIQUE (zoom_level, tile_column, tile_row));"
				))?;
				Ok(())
			})
			.with_context(|| format!("Failed to create table {name}"))?;
		Ok(self.table(name))
	}

	fn drop_overview_table(&self, name: &str) -> Result<bool> {
		self.ensure_alive()?;
		check_name(name)?;
		self.shared.with_connection(|c| {
			if !table_exists(c, name)? {
				return Ok(false);
			}
			c.execute_batch(&format!("DROP TABLE \"{name}\";"))?;
			Ok(true)
		})
	}

	fn create_overview_index(&self, name: &str) -> Result<()> {
		check_name(name)?;
		self.shared.with_connection(|c| {
			c.execute_batch(&format!(
				"CREATE INDEX IF NOT EXISTS \"{name}_index\" ON \"{name}\" (zoom_level, tile_column, tile_row);"
			))?;
			Ok(())
		})
	}

	fn drop_overview_index(&self, name: &str) -> Result<()> {
		check_name(name)?;
		self.shared.with_connection(|c| {
			c.execute_batch(&format!("DROP INDEX IF EXISTS \"{name}_index\";"))?;
			Ok(())
		})
	}

	fn begin_batch(&self) -> Result<()> {
		self.ensure_alive()?;
		let mut batch = self.shared.batch.lock();
		ensure!(batch.is_none(), "a batch is already in progress");
		let connection = self.shared.pool.get().context("Failed to get a SQLite connection")?;
		connection.execute_batch("BEGIN IMMEDIATE;")?;
		*batch = Some(connection);
		self.shared.in_batch.store(true, Ordering::Release);
		Ok(())
	}

	fn end_batch(&self) -> Result<()> {
		let mut batch = self.shared.batch.lock();
		let Some(connection) = batch.as_ref() else {
			bail!("no batch in progress");
		};
		connection.execute_batch("COMMIT;").context("Failed to commit batch")?;
		*batch = None;
		self.shared.in_batch.store(false, Ordering::Release);
		Ok(())
	}

	fn abort_batch(&self) -> Result<()> {
		let mut batch = self.shared.batch.lock();
		let Some(connection) = batch.take() else {
			bail!("no batch in progress");
		};
		self.shared.in_batch.store(false, Ordering::Release);
		connection.execute_batch("ROLLBACK;").context("Failed to roll back batch")?;
		Ok(())
	}

	fn is_batch_operation(&self) -> bool {
		self.shared.in_batch.load(Ordering::Acquire)
	}

	fn execute_lock(&self) -> &Mutex<()> {
		&self.execute_lock
	}

	fn destroy_feature_class(&self, name: &str) -> Result<()> {
		self.ensure_alive()?;
		check_name(name)?;
		self.shared.with_connection(|c| {
			c.execute_batch(&format!("DROP TABLE IF EXISTS \"{name}\";"))?;
			Ok(())
		})
	}

	fn destroy(&self) -> Result<()> {
		for name in self.table_names()? {
			self.shared.with_connection(|c| {
				c.execute_batch(&format!("DROP TABLE IF EXISTS \"{name}\";"))?;
				Ok(())
			})?;
		}
		self.destroyed.store(true, Ordering::Release);
		Ok(())
	}
}
