//! The [`VectorTile`] struct: the render-ready content of one tile.
//!
//! Items are kept grouped by feature id in ascending order. Two tiles built from the same
//! features therefore serialize to the same bytes, no matter in which order the features
//! were added.
//!
//! # Wire format
//!
//! All values are little-endian:
//!
//! ```text
//! u32 item count
//! per item:
//!   i64 feature id
//!   u8  geometry type (1 point, 2 line, 3 polygon)
//!   u16 vertex count
//!   vertex count × (f32 x, f32 y)
//!   polygons only: u32 index count, index count × u16 triangle index
//! ```
//!
//! # Examples
//!
//! ```rust
//! use tilepyramid_geometry::{TileGeometryType, VectorTile, VectorTileItem};
//!
//! let mut tile = VectorTile::new();
//! tile.add(vec![VectorTileItem::new(7, TileGeometryType::Point, vec![[1.0, 2.0]])], true);
//! let blob = tile.to_blob().unwrap();
//! assert_eq!(VectorTile::from_blob(&blob).unwrap(), tile);
//! ```

use super::VectorTileItem;
use anyhow::{Context, Result, ensure};
use std::collections::BTreeMap;
use tilepyramid_core::{
	Blob,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTile {
	items: BTreeMap<i64, Vec<VectorTileItem>>,
}

impl VectorTile {
	pub fn new() -> VectorTile {
		VectorTile::default()
	}

	/// Appends items. With `replace`, existing items of every feature in `items` are removed
	/// first, so the call replaces those features' contribution to this tile.
	///
	/// Invalid items are dropped.
	pub fn add(&mut self, items: Vec<VectorTileItem>, replace: bool) {
		if replace {
			let mut replaced = Vec::new();
			for item in &items {
				if !replaced.contains(&item.feature_id) {
					replaced.push(item.feature_id);
					self.items.remove(&item.feature_id);
				}
			}
		}
		for item in items {
			if !item.is_valid() {
				log::trace!("dropping invalid item of feature {}", item.feature_id);
				continue;
			}
			self.items.entry(item.feature_id).or_default().push(item);
		}
	}

	/// Removes all items of a feature. Returns `true` if any were present.
	pub fn remove(&mut self, feature_id: i64) -> bool {
		self.items.remove(&feature_id).is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// A tile is valid if it holds at least one item and all items are valid.
	pub fn is_valid(&self) -> bool {
		!self.items.is_empty() && self.items().all(VectorTileItem::is_valid)
	}

	pub fn item_count(&self) -> usize {
		self.items.values().map(Vec::len).sum()
	}

	/// Feature ids in ascending order.
	pub fn feature_ids(&self) -> impl Iterator<Item = i64> + '_ {
		self.items.keys().copied()
	}

	pub fn contains_feature(&self, feature_id: i64) -> bool {
		self.items.contains_key(&feature_id)
	}

	pub fn items_for(&self, feature_id: i64) -> &[VectorTileItem] {
		self.items.get(&feature_id).map_or(&[], Vec::as_slice)
	}

	/// All items, grouped by ascending feature id.
	pub fn items(&self) -> impl Iterator<Item = &VectorTileItem> + '_ {
		self.items.values().flatten()
	}

	pub fn from_blob(blob: &Blob) -> Result<VectorTile> {
		let mut tile = VectorTile::new();
		if blob.is_empty() {
			return Ok(tile);
		}

		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		let count = reader.read_u32().context("Failed to read item count")?;
		for index in 0..count {
			let item = VectorTileItem::read(&mut reader).with_context(|| format!("Failed to read item {index} of {count}"))?;
			tile.items.entry(item.feature_id).or_default().push(item);
		}
		ensure!(
			!reader.has_remaining(),
			"{} unexpected trailing bytes after {count} items",
			reader.remaining()
		);
		Ok(tile)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::with_capacity(4 + self.items().map(VectorTileItem::encoded_len).sum::<usize>());
		writer.write_u32(u32::try_from(self.item_count()).context("Too many items")?)?;
		for item in self.items() {
			item.write(&mut writer).context("Failed to write item")?;
		}
		Ok(writer.into_blob())
	}
}
