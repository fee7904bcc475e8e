use super::Geometry;
use crate::VectorTileItem;
use anyhow::Result;
use tilepyramid_core::Envelope;

/// Geometry operations needed to turn a feature into tile items.
///
/// Implementations must be usable from several tiling threads at once.
pub trait GeometryEngine: Send + Sync {
	/// Returns a simplified copy of `geometry`. A non-positive tolerance returns it unchanged.
	/// Parts that degenerate during simplification are dropped.
	fn simplify(&self, geometry: &Geometry, tolerance: f64) -> Geometry;

	/// Restricts `geometry` to `envelope`. Returns `None` if nothing remains.
	fn clip(&self, geometry: &Geometry, envelope: &Envelope) -> Option<Geometry>;

	/// Decomposes `geometry` into tile items tagged with `feature_id`, with vertices relative
	/// to `origin`.
	///
	/// # Errors
	/// Returns an error if a part cannot be encoded, e.g. a polygon with more vertices than
	/// an item can hold.
	fn fill_tile_items(
		&self,
		feature_id: i64,
		geometry: &Geometry,
		origin: [f64; 2],
		items: &mut Vec<VectorTileItem>,
	) -> Result<()>;
}
