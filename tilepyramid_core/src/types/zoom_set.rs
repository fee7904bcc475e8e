//! The set of materialized zoom levels.
//!
//! A `ZoomSet` is persisted as a comma-separated list such as `"0,1,2"`.
//!
//! # Examples
//!
//! ```
//! use tilepyramid_core::ZoomSet;
//!
//! let zooms = ZoomSet::parse(" 4, 2,2 ,0").unwrap();
//! assert_eq!(zooms.to_string(), "0,2,4");
//! assert_eq!(zooms.iter_fine_to_coarse().collect::<Vec<_>>(), vec![4, 2, 0]);
//! ```

use crate::MAX_ZOOM;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::{collections::BTreeSet, fmt};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoomSet(BTreeSet<u8>);

impl ZoomSet {
	#[must_use]
	pub fn new_empty() -> ZoomSet {
		ZoomSet(BTreeSet::new())
	}

	/// Parses a comma-separated list of zoom levels. Blank entries are ignored.
	///
	/// # Errors
	/// Returns an error if an entry is not an integer or exceeds [`MAX_ZOOM`].
	pub fn parse(text: &str) -> Result<ZoomSet> {
		let mut set = BTreeSet::new();
		for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
			let zoom: u8 = part
				.parse()
				.with_context(|| format!("invalid zoom level '{part}' in '{text}'"))?;
			ensure!(zoom <= MAX_ZOOM, "zoom level {zoom} must be <= {MAX_ZOOM}");
			set.insert(zoom);
		}
		Ok(ZoomSet(set))
	}

	/// Builds a set from zoom levels.
	///
	/// # Errors
	/// Returns an error if a level exceeds [`MAX_ZOOM`].
	pub fn from_levels(levels: impl IntoIterator<Item = u8>) -> Result<ZoomSet> {
		let set: BTreeSet<u8> = levels.into_iter().collect();
		if let Some(max) = set.last() {
			ensure!(*max <= MAX_ZOOM, "zoom level {max} must be <= {MAX_ZOOM}");
		}
		Ok(ZoomSet(set))
	}

	pub fn insert(&mut self, zoom: u8) {
		self.0.insert(zoom.min(MAX_ZOOM));
	}

	#[must_use]
	pub fn contains(&self, zoom: u8) -> bool {
		self.0.contains(&zoom)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Zoom levels in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
		self.0.iter().copied()
	}

	/// Zoom levels from the finest (highest) to the coarsest (lowest).
	pub fn iter_fine_to_coarse(&self) -> impl Iterator<Item = u8> + '_ {
		self.0.iter().rev().copied()
	}
}

impl fmt::Display for ZoomSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.iter().join(","))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("", "")]
	#[case("0,1,2", "0,1,2")]
	#[case("2, 1 ,0,", "0,1,2")]
	#[case("12,12,3", "3,12")]
	fn parse_and_format(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(ZoomSet::parse(input).unwrap().to_string(), expected);
	}

	#[rstest]
	#[case("a")]
	#[case("1,-2")]
	#[case("25")]
	fn parse_errors(#[case] input: &str) {
		assert!(ZoomSet::parse(input).is_err());
	}

	#[test]
	fn from_levels() {
		let zooms = ZoomSet::from_levels([2, 0, 1]).unwrap();
		assert_eq!(zooms.len(), 3);
		assert!(zooms.contains(1));
		assert!(!zooms.contains(3));
		assert_eq!(zooms.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
		assert!(ZoomSet::from_levels([30]).is_err());
		assert!(ZoomSet::new_empty().is_empty());
	}
}
