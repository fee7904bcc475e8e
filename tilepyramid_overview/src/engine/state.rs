use crate::OverviewError;
use anyhow::Result;
use std::{
	fmt,
	sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle of the overview cache of one feature class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OverviewState {
	/// No usable cache. Lookups compute tiles on the fly.
	NoOverview = 0,
	/// A rebuild is running. Lookups return empty tiles.
	Building = 1,
	/// The cache is complete for the persisted zoom set.
	Ready = 2,
}

impl OverviewState {
	fn from_u8(value: u8) -> OverviewState {
		match value {
			1 => OverviewState::Building,
			2 => OverviewState::Ready,
			_ => OverviewState::NoOverview,
		}
	}
}

impl fmt::Display for OverviewState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			OverviewState::NoOverview => "no overview",
			OverviewState::Building => "building",
			OverviewState::Ready => "ready",
		})
	}
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
	pub fn new(state: OverviewState) -> StateCell {
		StateCell(AtomicU8::new(state as u8))
	}

	pub fn get(&self) -> OverviewState {
		OverviewState::from_u8(self.0.load(Ordering::Acquire))
	}

	pub fn set(&self, state: OverviewState) {
		let previous = OverviewState::from_u8(self.0.swap(state as u8, Ordering::AcqRel));
		if previous != state {
			log::debug!("overview state {previous} -> {state}");
		}
	}

	/// Enters [`OverviewState::Building`] and returns the state left behind.
	///
	/// # Errors
	/// Returns [`OverviewError::RebuildInProgress`] if another rebuild is running.
	pub fn begin_building(&self) -> Result<OverviewState> {
		let mut current = self.0.load(Ordering::Acquire);
		loop {
			if current == OverviewState::Building as u8 {
				return Err(OverviewError::RebuildInProgress.into());
			}
			match self
				.0
				.compare_exchange(current, OverviewState::Building as u8, Ordering::AcqRel, Ordering::Acquire)
			{
				Ok(previous) => {
					let previous = OverviewState::from_u8(previous);
					log::debug!("overview state {previous} -> {}", OverviewState::Building);
					return Ok(previous);
				}
				Err(actual) => current = actual,
			}
		}
	}
}
