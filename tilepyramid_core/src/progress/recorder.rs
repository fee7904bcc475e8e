use super::{Progress, ProgressStatus};
use parking_lot::Mutex;
use std::sync::Arc;

/// A single report received by a [`ProgressRecorder`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
	pub status: ProgressStatus,
	pub fraction: f64,
	pub message: String,
}

/// Collects progress reports, optionally requesting cancellation after a number of reports.
///
/// Mostly useful in tests and for callers that poll progress from another thread.
#[derive(Clone, Debug, Default)]
pub struct ProgressRecorder {
	events: Arc<Mutex<Vec<ProgressEvent>>>,
	cancel_after: Option<usize>,
}

impl ProgressRecorder {
	#[must_use]
	pub fn new() -> ProgressRecorder {
		ProgressRecorder::default()
	}

	/// The returned progress answers `false` once `reports` reports have been received.
	#[must_use]
	pub fn cancelling_after(reports: usize) -> ProgressRecorder {
		ProgressRecorder {
			events: Arc::default(),
			cancel_after: Some(reports),
		}
	}

	/// Creates a [`Progress`] feeding this recorder.
	#[must_use]
	pub fn progress(&self) -> Progress {
		let events = Arc::clone(&self.events);
		let cancel_after = self.cancel_after;
		Progress::new(move |status, fraction, message| {
			let mut events = events.lock();
			events.push(ProgressEvent {
				status,
				fraction,
				message: message.to_string(),
			});
			cancel_after.is_none_or(|limit| events.len() < limit)
		})
	}

	#[must_use]
	pub fn events(&self) -> Vec<ProgressEvent> {
		self.events.lock().clone()
	}

	#[must_use]
	pub fn last_status(&self) -> Option<ProgressStatus> {
		self.events.lock().last().map(|e| e.status)
	}
}
