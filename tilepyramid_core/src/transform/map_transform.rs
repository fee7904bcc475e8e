//! World to display projection for a map view.
//!
//! [`MapTransform`] composes two orthographic matrices:
//! world → scene maps the visible extent onto normalized device coordinates, and
//! scene → view maps those onto physical display pixels. Display pixels are logical pixels
//! multiplied by the device pixel ratio.
//!
//! # Examples
//!
//! ```
//! use tilepyramid_core::{MapTransform, WORLD_BOUNDS};
//!
//! let mut transform = MapTransform::new(256, 256);
//! transform.set_extent(&WORLD_BOUNDS).unwrap();
//! let [x, y] = transform.world_to_display([0.0, 0.0]);
//! assert!((x - 128.0).abs() < 1e-6 && (y - 128.0).abs() < 1e-6);
//! assert!(transform.zoom().abs() < 1e-9);
//! ```

use crate::{Envelope, TILE_SIZE, WORLD_BOUNDS, WORLD_MAX, WORLD_MIN, WORLD_WIDTH};
use anyhow::{Result, ensure};
use glam::{DMat4, DVec3};

#[derive(Clone, Debug)]
pub struct MapTransform {
	display_width: u32,
	display_height: u32,
	device_pixel_ratio: f64,
	y_axis_inverted: bool,
	x_axis_looped: bool,
	center: [f64; 2],
	/// Physical display pixels per world unit.
	scale: f64,
	extent: Envelope,
	world_to_scene: DMat4,
	scene_to_view: DMat4,
	world_to_display: DMat4,
	display_to_world: DMat4,
}

impl MapTransform {
	/// Creates a transform for a display of `width` × `height` logical pixels showing the whole world.
	#[must_use]
	pub fn new(width: u32, height: u32) -> MapTransform {
		let mut transform = MapTransform {
			display_width: width.max(1),
			display_height: height.max(1),
			device_pixel_ratio: 1.0,
			y_axis_inverted: false,
			x_axis_looped: false,
			center: [0.0, 0.0],
			scale: 1.0,
			extent: WORLD_BOUNDS,
			world_to_scene: DMat4::IDENTITY,
			scene_to_view: DMat4::IDENTITY,
			world_to_display: DMat4::IDENTITY,
			display_to_world: DMat4::IDENTITY,
		};
		transform.scale = transform.fit_scale(&WORLD_BOUNDS);
		transform.update();
		transform
	}

	/// Changes the display size, keeping scale and center.
	///
	/// With `y_inverted` the display's y axis points down (row 0 at the top), as for most
	/// windowing systems.
	pub fn set_display_size(&mut self, width: u32, height: u32, y_inverted: bool) {
		self.display_width = width.max(1);
		self.display_height = height.max(1);
		self.y_axis_inverted = y_inverted;
		self.update();
	}

	/// # Errors
	/// Returns an error if `ratio` is not a positive finite number.
	pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> Result<()> {
		ensure!(ratio.is_finite() && ratio > 0.0, "invalid device pixel ratio {ratio}");
		self.scale *= ratio / self.device_pixel_ratio;
		self.device_pixel_ratio = ratio;
		self.update();
		Ok(())
	}

	/// When looped, the center is folded back into the world horizontally.
	pub fn set_x_axis_looped(&mut self, looped: bool) {
		self.x_axis_looped = looped;
		self.update();
	}

	/// Shows `envelope` as large as possible. The resulting extent keeps the display's aspect
	/// ratio, so it covers `envelope` and possibly more along one axis.
	///
	/// # Errors
	/// Returns an error if the envelope is invalid or has neither width nor height.
	pub fn set_extent(&mut self, envelope: &Envelope) -> Result<()> {
		ensure!(envelope.is_valid(), "invalid extent {envelope}");
		ensure!(
			envelope.width() > 0.0 || envelope.height() > 0.0,
			"extent {envelope} has no area"
		);
		self.scale = self.fit_scale(envelope);
		self.center = envelope.center();
		self.update();
		Ok(())
	}

	/// Adjusts `envelope` to the display's aspect ratio before showing it.
	///
	/// # Errors
	/// See [`MapTransform::set_extent`].
	pub fn fit_envelope(&mut self, envelope: &Envelope) -> Result<()> {
		let ratio = f64::from(self.display_width) / f64::from(self.display_height);
		self.set_extent(&envelope.with_ratio(ratio))
	}

	/// # Errors
	/// Returns an error if `scale` is not a positive finite number.
	pub fn set_scale(&mut self, scale: f64) -> Result<()> {
		ensure!(scale.is_finite() && scale > 0.0, "invalid scale {scale}");
		self.scale = scale;
		self.update();
		Ok(())
	}

	pub fn set_center(&mut self, x: f64, y: f64) {
		self.center = [x, y];
		self.update();
	}

	/// # Errors
	/// Returns an error if `scale` is not a positive finite number.
	pub fn set_scale_and_center(&mut self, scale: f64, x: f64, y: f64) -> Result<()> {
		ensure!(scale.is_finite() && scale > 0.0, "invalid scale {scale}");
		self.scale = scale;
		self.center = [x, y];
		self.update();
		Ok(())
	}

	#[must_use]
	pub fn extent(&self) -> Envelope {
		self.extent
	}

	#[must_use]
	pub fn center(&self) -> [f64; 2] {
		self.center
	}

	#[must_use]
	pub fn scale(&self) -> f64 {
		self.scale
	}

	#[must_use]
	pub fn device_pixel_ratio(&self) -> f64 {
		self.device_pixel_ratio
	}

	/// Continuous zoom level: 0 when the world is [`TILE_SIZE`] logical pixels wide, +1 per doubling.
	#[must_use]
	pub fn zoom(&self) -> f64 {
		let pixels_per_world = self.scale * WORLD_WIDTH / (f64::from(TILE_SIZE) * self.device_pixel_ratio);
		pixels_per_world.log2().max(0.0)
	}

	/// Maps world coordinates to physical display pixels.
	#[must_use]
	pub fn world_to_display(&self, point: [f64; 2]) -> [f64; 2] {
		let p = self.world_to_display.transform_point3(DVec3::new(point[0], point[1], 0.0));
		[p.x, p.y]
	}

	/// Maps physical display pixels to world coordinates.
	#[must_use]
	pub fn display_to_world(&self, point: [f64; 2]) -> [f64; 2] {
		let p = self.display_to_world.transform_point3(DVec3::new(point[0], point[1], 0.0));
		[p.x, p.y]
	}

	/// Maps world coordinates to normalized scene coordinates in `[-1, 1]`.
	#[must_use]
	pub fn world_to_scene(&self, point: [f64; 2]) -> [f64; 2] {
		let p = self.world_to_scene.transform_point3(DVec3::new(point[0], point[1], 0.0));
		[p.x, p.y]
	}

	fn pixel_size(&self) -> (f64, f64) {
		(
			f64::from(self.display_width) * self.device_pixel_ratio,
			f64::from(self.display_height) * self.device_pixel_ratio,
		)
	}

	fn fit_scale(&self, envelope: &Envelope) -> f64 {
		let (width, height) = self.pixel_size();
		let scale_x = width / envelope.width();
		let scale_y = height / envelope.height();
		scale_x.min(scale_y)
	}

	fn update(&mut self) {
		if self.x_axis_looped {
			while self.center[0] > WORLD_MAX {
				self.center[0] -= WORLD_WIDTH;
			}
			while self.center[0] < WORLD_MIN {
				self.center[0] += WORLD_WIDTH;
			}
		}

		let (width, height) = self.pixel_size();
		let half_width = width / self.scale / 2.0;
		let half_height = height / self.scale / 2.0;
		let [x, y] = self.center;
		self.extent = Envelope::new(x - half_width, y - half_height, x + half_width, y + half_height);

		let e = &self.extent;
		self.world_to_scene = if self.y_axis_inverted {
			DMat4::orthographic_rh_gl(e.min_x, e.max_x, e.max_y, e.min_y, -1.0, 1.0)
		} else {
			DMat4::orthographic_rh_gl(e.min_x, e.max_x, e.min_y, e.max_y, -1.0, 1.0)
		};
		self.scene_to_view = DMat4::orthographic_rh_gl(0.0, width, 0.0, height, -1.0, 1.0).inverse();
		self.world_to_display = self.scene_to_view * self.world_to_scene;
		self.display_to_world = self.world_to_display.inverse();
	}
}
