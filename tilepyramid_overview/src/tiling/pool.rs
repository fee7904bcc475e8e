//! Parallel tiling of many features.
//!
//! The calling thread produces features (usually from one scan of the source) into a bounded
//! job queue. Worker threads tile each feature at all zoom levels and append the result to a
//! shared [`TileAccumulator`]. The calling thread reports progress as jobs complete and turns
//! a `false` from the progress callback into cancellation: remaining jobs are skipped and the
//! accumulated tiles are discarded.

use super::{FeatureTiler, TileAccumulator};
use crate::Feature;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::{
	collections::BTreeMap,
	sync::atomic::{AtomicBool, Ordering},
	thread,
	time::Duration,
};
use tilepyramid_core::{
	TileAddress,
	progress::{Progress, ProgressStatus},
};
use tilepyramid_geometry::VectorTile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JobOutcome {
	Tiled,
	Skipped,
	Failed,
}

/// The result of a completed pool run.
#[derive(Debug, Default)]
pub struct TilingReport {
	/// Features whose items were accumulated.
	pub features: u64,
	/// Features skipped because their geometry could not be tiled.
	pub skipped_features: u64,
	/// Features dropped because the accumulation lock timed out on every attempt.
	pub failed_features: u64,
	pub tiles: BTreeMap<TileAddress, VectorTile>,
}

impl TilingReport {
	fn record(&mut self, outcome: JobOutcome) {
		match outcome {
			JobOutcome::Tiled => self.features += 1,
			JobOutcome::Skipped => self.skipped_features += 1,
			JobOutcome::Failed => self.failed_features += 1,
		}
	}

	fn processed(&self) -> u64 {
		self.features + self.skipped_features + self.failed_features
	}
}

/// A fixed number of tiling threads plus the calling thread.
#[derive(Clone, Debug)]
pub struct TilingPool {
	threads: usize,
	retries: u32,
	lock_timeout: Duration,
}

impl TilingPool {
	#[must_use]
	pub fn new(threads: usize, retries: u32, lock_timeout: Duration) -> TilingPool {
		TilingPool {
			threads: threads.max(1),
			retries,
			lock_timeout,
		}
	}

	/// Tiles all features handed to the sink by `produce`.
	///
	/// `produce` runs on the calling thread and passes every feature to the sink, stopping
	/// early when the sink returns `false`. `total` is the expected number of features and
	/// only scales progress.
	///
	/// Returns `None` if the run was cancelled through `progress`.
	///
	/// # Errors
	/// Returns the error of `produce`, or an error if a worker thread cannot be started.
	pub fn run<F>(&self, tiler: &FeatureTiler, total: u64, produce: F, progress: &Progress) -> Result<Option<TilingReport>>
	where
		F: FnOnce(&mut dyn FnMut(Feature) -> bool) -> Result<()>,
	{
		let accumulator = TileAccumulator::new(self.lock_timeout);
		let Some(mut report) = self.feed(tiler, &accumulator, total, produce, progress)? else {
			return Ok(None);
		};
		report.tiles = accumulator.into_tiles();
		log::debug!(
			"tiled {} features into {} tiles ({} skipped, {} failed)",
			report.features,
			report.tiles.len(),
			report.skipped_features,
			report.failed_features
		);
		Ok(Some(report))
	}

	/// Runs the workers against `accumulator` and counts the outcomes. The returned report has
	/// no tiles.
	fn feed<F>(
		&self,
		tiler: &FeatureTiler,
		accumulator: &TileAccumulator,
		total: u64,
		produce: F,
		progress: &Progress,
	) -> Result<Option<TilingReport>>
	where
		F: FnOnce(&mut dyn FnMut(Feature) -> bool) -> Result<()>,
	{
		let cancelled = AtomicBool::new(false);
		let mut report = TilingReport::default();
		let total = total.max(1) as f64;

		let produced = thread::scope(|scope| -> Result<()> {
			let (job_sender, job_receiver) = bounded::<Feature>(self.threads * 4);
			let (done_sender, done_receiver) = unbounded::<JobOutcome>();

			for index in 0..self.threads {
				let jobs = job_receiver.clone();
				let done = done_sender.clone();
				let cancelled = &cancelled;
				thread::Builder::new()
					.name(format!("tiling-{index}"))
					.spawn_scoped(scope, move || self.work(tiler, accumulator, cancelled, &jobs, &done))
					.context("Failed to start tiling thread")?;
			}
			drop(job_receiver);
			drop(done_sender);

			let on_done = |outcome: JobOutcome, report: &mut TilingReport| {
				report.record(outcome);
				let fraction = report.processed() as f64 / total;
				if !progress.on_progress(ProgressStatus::InProcess, fraction, "tiling features")
					&& !cancelled.swap(true, Ordering::AcqRel)
				{
					log::debug!("tiling cancelled after {} features", report.processed());
				}
			};

			let produced = {
				let mut sink = |feature: Feature| -> bool {
					while let Ok(outcome) = done_receiver.try_recv() {
						on_done(outcome, &mut report);
					}
					if cancelled.load(Ordering::Acquire) {
						return false;
					}
					job_sender.send(feature).is_ok()
				};
				produce(&mut sink)
			};
			drop(job_sender);
			if produced.is_err() {
				cancelled.store(true, Ordering::Release);
			}

			for outcome in &done_receiver {
				on_done(outcome, &mut report);
			}
			produced
		});
		produced?;

		if cancelled.load(Ordering::Acquire) {
			return Ok(None);
		}
		Ok(Some(report))
	}

	fn work(
		&self,
		tiler: &FeatureTiler,
		accumulator: &TileAccumulator,
		cancelled: &AtomicBool,
		jobs: &Receiver<Feature>,
		done: &Sender<JobOutcome>,
	) {
		for feature in jobs {
			if cancelled.load(Ordering::Acquire) {
				continue;
			}
			let outcome = self.process(tiler, accumulator, &feature);
			if done.send(outcome).is_err() {
				break;
			}
		}
	}

	fn process(&self, tiler: &FeatureTiler, accumulator: &TileAccumulator, feature: &Feature) -> JobOutcome {
		let mut tiles = match tiler.tile_feature(feature) {
			Ok(tiles) => tiles,
			Err(error) => {
				log::warn!("skipping feature {}: {error:#}", feature.id);
				return JobOutcome::Skipped;
			}
		};
		tiles.retain(|_, items| !items.is_empty());

		let mut attempt = 0;
		loop {
			match accumulator.append(&mut tiles) {
				Ok(()) => return JobOutcome::Tiled,
				Err(error) if attempt < self.retries => {
					attempt += 1;
					log::debug!("retrying feature {} ({attempt}/{}): {error}", feature.id, self.retries);
				}
				Err(error) => {
					log::warn!("dropping feature {}: {error}", feature.id);
					return JobOutcome::Failed;
				}
			}
		}
	}
}
