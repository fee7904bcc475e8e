//! Per-call options in the `KEY=VALUE` form hosts pass around.
//!
//! Recognized keys (case-insensitive): `ZOOM_LEVELS`, `FORCE`, `CREATE_OVERVIEWS`.
//! Unknown keys are ignored so hosts can pass their full option list.

use crate::OverviewError;
use anyhow::Result;
use tilepyramid_core::ZoomSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverviewOptions {
	/// Zoom levels to materialize. `None` falls back to the persisted set.
	pub zoom_levels: Option<ZoomSet>,
	/// Rebuild even if a cache already exists.
	pub force: bool,
	/// Build overviews after rows were copied in bulk.
	pub create_overviews: bool,
}

impl OverviewOptions {
	#[must_use]
	pub fn new() -> OverviewOptions {
		OverviewOptions::default()
	}

	#[must_use]
	pub fn with_zoom_levels(mut self, zoom_levels: ZoomSet) -> OverviewOptions {
		self.zoom_levels = Some(zoom_levels);
		self
	}

	#[must_use]
	pub fn with_force(mut self, force: bool) -> OverviewOptions {
		self.force = force;
		self
	}

	/// Parses a list of `KEY=VALUE` strings.
	///
	/// # Errors
	/// Returns a configuration error for malformed entries or values.
	pub fn from_list<S: AsRef<str>>(list: &[S]) -> Result<OverviewOptions> {
		let mut pairs = Vec::with_capacity(list.len());
		for entry in list {
			let entry = entry.as_ref();
			let Some((key, value)) = entry.split_once('=') else {
				return Err(OverviewError::Configuration(format!("option '{entry}' is not in KEY=VALUE form")).into());
			};
			pairs.push((key, value));
		}
		OverviewOptions::from_pairs(&pairs)
	}

	/// Parses `(key, value)` pairs.
	///
	/// # Errors
	/// Returns a configuration error for invalid zoom lists or boolean values.
	pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<OverviewOptions> {
		let mut options = OverviewOptions::default();
		for (key, value) in pairs {
			let key = key.trim();
			let value = value.trim();
			match key.to_ascii_uppercase().as_str() {
				"ZOOM_LEVELS" => {
					let zooms = ZoomSet::parse(value)
						.map_err(|e| OverviewError::Configuration(format!("invalid ZOOM_LEVELS: {e}")))?;
					options.zoom_levels = Some(zooms);
				}
				"FORCE" => options.force = parse_bool(key, value)?,
				"CREATE_OVERVIEWS" => options.create_overviews = parse_bool(key, value)?,
				_ => log::trace!("ignoring option {key}"),
			}
		}
		Ok(options)
	}
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
	match value.to_ascii_uppercase().as_str() {
		"YES" | "TRUE" | "ON" | "1" => Ok(true),
		"NO" | "FALSE" | "OFF" | "0" => Ok(false),
		_ => Err(OverviewError::Configuration(format!("invalid boolean '{value}' for {key}")).into()),
	}
}
