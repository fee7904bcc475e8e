//! Progress reporting and cooperative cancellation for long-running operations.
//!
//! A [`Progress`] wraps an optional callback `(status, fraction, message) -> continue`. Returning
//! `false` from the callback asks the running operation to stop at its next checkpoint.
//!
//! Multi-step operations call [`Progress::set_total_steps`] once and [`Progress::set_step`] per
//! step; per-step fractions are then mapped onto the overall range so the reported value never
//! goes backwards.
//!
//! # Examples
//!
//! ```rust
//! use tilepyramid_core::progress::{Progress, ProgressStatus};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let mut progress = Progress::new(move |_status, fraction, _message| {
//!     sink.lock().unwrap().push(fraction);
//!     true
//! });
//! progress.set_total_steps(2);
//! progress.set_step(1);
//! assert!(progress.on_progress(ProgressStatus::InProcess, 0.5, "saving"));
//! assert_eq!(*seen.lock().unwrap(), vec![0.75]);
//! ```

mod recorder;

pub use recorder::*;

use std::{
	fmt::{self, Debug},
	sync::Arc,
};

/// Status code passed with every progress report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgressStatus {
	InProcess,
	Finished,
	CreateFailed,
}

/// The callback signature. Returns `false` to request cancellation.
pub type ProgressCallback = dyn Fn(ProgressStatus, f64, &str) -> bool + Send + Sync;

#[derive(Clone)]
pub struct Progress {
	callback: Option<Arc<ProgressCallback>>,
	total_steps: u32,
	step: u32,
}

impl Progress {
	pub fn new(callback: impl Fn(ProgressStatus, f64, &str) -> bool + Send + Sync + 'static) -> Progress {
		Progress {
			callback: Some(Arc::new(callback)),
			total_steps: 1,
			step: 0,
		}
	}

	/// A progress channel that reports nowhere and never cancels.
	#[must_use]
	pub fn silent() -> Progress {
		Progress {
			callback: None,
			total_steps: 1,
			step: 0,
		}
	}

	pub fn set_total_steps(&mut self, total_steps: u32) {
		self.total_steps = total_steps.max(1);
		self.step = self.step.min(self.total_steps - 1);
	}

	pub fn set_step(&mut self, step: u32) {
		self.step = step.min(self.total_steps - 1);
	}

	#[must_use]
	pub fn total_steps(&self) -> u32 {
		self.total_steps
	}

	#[must_use]
	pub fn step(&self) -> u32 {
		self.step
	}

	/// Reports progress and returns whether the operation should continue.
	///
	/// For [`ProgressStatus::InProcess`] the fraction of the current step is mapped into the
	/// overall range. Other statuses are passed through unchanged.
	pub fn on_progress(&self, status: ProgressStatus, fraction: f64, message: &str) -> bool {
		let Some(callback) = &self.callback else {
			return true;
		};
		let fraction = if status == ProgressStatus::InProcess {
			let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
			(f64::from(self.step) + fraction) / f64::from(self.total_steps)
		} else {
			fraction
		};
		callback(status, fraction, message)
	}
}

impl Default for Progress {
	fn default() -> Self {
		Progress::silent()
	}
}

impl Debug for Progress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Progress")
			.field("has_callback", &self.callback.is_some())
			.field("step", &self.step)
			.field("total_steps", &self.total_steps)
			.finish()
	}
}
