use crate::OverviewError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
	time::Duration,
};
use tilepyramid_core::{ConcurrencyLimits, TILE_SIZE};

/// Tunables of an [`OverviewEngine`](crate::OverviewEngine), usually loaded from YAML.
///
/// ```yaml
/// threads: 4
/// job_retries: 3
/// accumulation_timeout_ms: 150000
/// read_timeout_ms: 10500
/// execute_timeout_ms: 150000
/// tile_size: 256
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct OverviewConfig {
	/// Number of tiling worker threads. Defaults to the number of logical cores.
	pub threads: usize,

	/// Attempts per feature when the accumulation lock cannot be acquired.
	pub job_retries: u32,

	/// Bounded wait for the shared accumulation map, in milliseconds.
	pub accumulation_timeout_ms: u64,

	/// Bounded wait for the interactive on-the-fly read path, in milliseconds.
	pub read_timeout_ms: u64,

	/// Bounded wait for the host's execute lock, in milliseconds.
	pub execute_timeout_ms: u64,

	/// Base tile size in pixels, used by the point tolerance policy.
	pub tile_size: u16,
}

impl Default for OverviewConfig {
	fn default() -> Self {
		OverviewConfig {
			threads: ConcurrencyLimits::default().cpu_bound,
			job_retries: 3,
			accumulation_timeout_ms: 150_000,
			read_timeout_ms: 10_500,
			execute_timeout_ms: 150_000,
			tile_size: TILE_SIZE,
		}
	}
}

impl OverviewConfig {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		let config: OverviewConfig = serde_yaml_ng::from_reader(reader)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		let config: OverviewConfig = serde_yaml_ng::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("Failed to open config file {path:?}"))?;
		OverviewConfig::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse config file {path:?}"))
	}

	fn validate(&self) -> Result<()> {
		if self.threads == 0 {
			return Err(OverviewError::Configuration("threads must be at least 1".to_string()).into());
		}
		if self.tile_size < 8 {
			return Err(OverviewError::Configuration(format!("tile_size ({}) must be at least 8", self.tile_size)).into());
		}
		Ok(())
	}

	#[must_use]
	pub fn accumulation_timeout(&self) -> Duration {
		Duration::from_millis(self.accumulation_timeout_ms)
	}

	#[must_use]
	pub fn read_timeout(&self) -> Duration {
		Duration::from_millis(self.read_timeout_ms)
	}

	#[must_use]
	pub fn execute_timeout(&self) -> Duration {
		Duration::from_millis(self.execute_timeout_ms)
	}
}
