//! Feature geometries are plain [`geo::Geometry<f64>`] values in world coordinates.
//!
//! The [`GeometryEngine`] trait is the seam through which tiling code simplifies, clips and
//! decomposes geometries; [`GeoEngine`] implements it on top of the `geo` crate.

mod engine;
mod geo_engine;
mod kind;

pub use engine::*;
pub use geo_engine::*;
pub use kind::*;

use geo::BoundingRect;
use tilepyramid_core::Envelope;

/// Geometry type used throughout the workspace.
pub type Geometry = geo::Geometry<f64>;

/// The bounding envelope of a geometry, or `None` if it has no coordinates.
#[must_use]
pub fn geometry_envelope(geometry: &Geometry) -> Option<Envelope> {
	let rect = geometry.bounding_rect()?;
	Some(Envelope::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
}
