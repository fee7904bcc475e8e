//! This module defines the `Envelope` struct, an axis-aligned rectangle in world coordinates.
//!
//! # Examples
//!
//! ```rust
//! use tilepyramid_core::Envelope;
//!
//! let a = Envelope::new(0.0, 0.0, 10.0, 10.0);
//! let b = Envelope::new(5.0, 5.0, 20.0, 20.0);
//! assert!(a.intersects(&b));
//! assert_eq!(a.merged(&b), Envelope::new(0.0, 0.0, 20.0, 20.0));
//! ```

use std::fmt::{self, Debug, Display};

/// An axis-aligned bounding rectangle. `min_x <= max_x` and `min_y <= max_y` hold for
/// every envelope built through [`Envelope::new`].
#[derive(Clone, Copy, Default, PartialEq)]
pub struct Envelope {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Envelope {
	/// Creates a new envelope, swapping the bounds of an axis if they are reversed.
	///
	/// # Examples
	///
	/// ```rust
	/// use tilepyramid_core::Envelope;
	///
	/// let env = Envelope::new(10.0, 2.0, -10.0, 4.0);
	/// assert_eq!(env.min_x, -10.0);
	/// assert_eq!(env.max_x, 10.0);
	/// ```
	#[must_use]
	pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Envelope {
		Envelope {
			min_x: x1.min(x2),
			min_y: y1.min(y2),
			max_x: x1.max(x2),
			max_y: y1.max(y2),
		}
	}

	/// Creates a zero-sized envelope around a single point.
	#[must_use]
	pub fn from_point(x: f64, y: f64) -> Envelope {
		Envelope {
			min_x: x,
			min_y: y,
			max_x: x,
			max_y: y,
		}
	}

	/// Returns `true` if all bounds are finite and ordered.
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.min_x.is_finite()
			&& self.min_y.is_finite()
			&& self.max_x.is_finite()
			&& self.max_y.is_finite()
			&& self.min_x <= self.max_x
			&& self.min_y <= self.max_y
	}

	#[must_use]
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	#[must_use]
	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	/// Returns the center as `[x, y]`.
	#[must_use]
	pub fn center(&self) -> [f64; 2] {
		[
			self.min_x + self.width() / 2.0,
			self.min_y + self.height() / 2.0,
		]
	}

	/// Returns `true` if both envelopes share at least one point. Touching edges count.
	#[must_use]
	pub fn intersects(&self, other: &Envelope) -> bool {
		self.min_x <= other.max_x && other.min_x <= self.max_x && self.min_y <= other.max_y && other.min_y <= self.max_y
	}

	/// Returns `true` if `other` lies completely inside this envelope.
	#[must_use]
	pub fn contains(&self, other: &Envelope) -> bool {
		self.min_x <= other.min_x && self.min_y <= other.min_y && self.max_x >= other.max_x && self.max_y >= other.max_y
	}

	#[must_use]
	pub fn contains_point(&self, x: f64, y: f64) -> bool {
		x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
	}

	/// Grows this envelope so it also covers `other`.
	pub fn merge(&mut self, other: &Envelope) {
		self.min_x = self.min_x.min(other.min_x);
		self.min_y = self.min_y.min(other.min_y);
		self.max_x = self.max_x.max(other.max_x);
		self.max_y = self.max_y.max(other.max_y);
	}

	#[must_use]
	pub fn merged(&self, other: &Envelope) -> Envelope {
		let mut envelope = *self;
		envelope.merge(other);
		envelope
	}

	/// Scales width and height by `factor`, keeping the center in place.
	///
	/// # Examples
	///
	/// ```rust
	/// use tilepyramid_core::Envelope;
	///
	/// let env = Envelope::new(0.0, 0.0, 10.0, 10.0).resized(1.1);
	/// assert!((env.min_x + 0.5).abs() < 1e-9);
	/// assert!((env.max_y - 10.5).abs() < 1e-9);
	/// ```
	#[must_use]
	pub fn resized(&self, factor: f64) -> Envelope {
		let half_width = self.width() * factor / 2.0;
		let half_height = self.height() * factor / 2.0;
		let [x, y] = self.center();
		Envelope {
			min_x: x - half_width,
			min_y: y - half_height,
			max_x: x + half_width,
			max_y: y + half_height,
		}
	}

	/// Grows the envelope by `margin` on every side.
	#[must_use]
	pub fn expanded(&self, margin: f64) -> Envelope {
		Envelope::new(
			self.min_x - margin,
			self.min_y - margin,
			self.max_x + margin,
			self.max_y + margin,
		)
	}

	#[must_use]
	pub fn translated(&self, dx: f64, dy: f64) -> Envelope {
		Envelope {
			min_x: self.min_x + dx,
			min_y: self.min_y + dy,
			max_x: self.max_x + dx,
			max_y: self.max_y + dy,
		}
	}

	/// Grows one axis around the center until `width / height == ratio`.
	///
	/// Used to fit an envelope to the aspect ratio of a display.
	#[must_use]
	pub fn with_ratio(&self, ratio: f64) -> Envelope {
		if ratio <= 0.0 || !ratio.is_finite() {
			return *self;
		}
		let [x, y] = self.center();
		let mut half_width = self.width() / 2.0;
		let mut half_height = self.height() / 2.0;
		if half_height == 0.0 || half_width / half_height < ratio {
			half_width = half_height * ratio;
		} else {
			half_height = half_width / ratio;
		}
		Envelope {
			min_x: x - half_width,
			min_y: y - half_height,
			max_x: x + half_width,
			max_y: y + half_height,
		}
	}
}

impl Debug for Envelope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Envelope({}, {}, {}, {})",
			self.min_x, self.min_y, self.max_x, self.max_y
		)
	}
}

impl Display for Envelope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {}, {}, {}]", self.min_x, self.min_y, self.max_x, self.max_y)
	}
}
