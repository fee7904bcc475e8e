//! Worker counts for the CPU-bound tiling work.
//!
//! ```
//! use tilepyramid_core::ConcurrencyLimits;
//!
//! let limits = ConcurrencyLimits::with_workers(Some(0));
//! assert_eq!(limits.cpu_bound, 1);
//! assert_eq!(ConcurrencyLimits::with_workers(None).cpu_bound, ConcurrencyLimits::cpu_count());
//! ```

/// Concurrency limits for the tiling worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
	/// Number of worker threads for clip and simplify jobs. Never zero.
	pub cpu_bound: usize,
}

impl ConcurrencyLimits {
	/// Uses `workers` if given, otherwise the logical CPU count.
	#[must_use]
	pub fn with_workers(workers: Option<usize>) -> Self {
		Self {
			cpu_bound: workers.unwrap_or_else(num_cpus::get).max(1),
		}
	}

	/// Get the number of logical CPUs available
	#[must_use]
	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	fn default() -> Self {
		Self::with_workers(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_limits() {
		let limits = ConcurrencyLimits::default();
		assert_eq!(limits.cpu_bound, num_cpus::get().max(1));
	}

	#[test]
	fn test_custom_limits() {
		assert_eq!(ConcurrencyLimits::with_workers(Some(6)).cpu_bound, 6);
	}

	#[test]
	fn test_limits_minimum_one() {
		assert_eq!(ConcurrencyLimits::with_workers(Some(0)).cpu_bound, 1);
	}
}
