//! Error taxonomy of the overview engine.
//!
//! Engine functions return `anyhow::Result`; failures that callers may want to tell apart
//! carry an [`OverviewError`] that can be recovered with `err.downcast_ref::<OverviewError>()`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverviewError {
	/// The setup cannot support overviews, e.g. an unsupported host container or a feature
	/// class without geometry column.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// Creating, opening or writing the overview table failed.
	#[error("storage error: {0}")]
	Storage(String),

	/// A feature geometry could not be tiled. Skipped, never fatal for a rebuild.
	#[error("invalid geometry of feature {feature_id}: {reason}")]
	Geometry { feature_id: i64, reason: String },

	/// Another rebuild of the same cache is running.
	#[error("a rebuild is already in progress")]
	RebuildInProgress,

	/// A lock was not acquired within its timeout. Transient and scoped to one operation.
	#[error("could not acquire the {what} within {timeout:?}")]
	ConcurrencyTimeout { what: &'static str, timeout: Duration },
}

impl OverviewError {
	/// Wraps a storage failure, keeping the whole context chain of `error` in the message.
	pub fn storage(action: &str, error: &anyhow::Error) -> anyhow::Error {
		OverviewError::Storage(format!("{action}: {error:#}")).into()
	}

	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			OverviewError::ConcurrencyTimeout { .. } | OverviewError::RebuildInProgress
		)
	}
}
