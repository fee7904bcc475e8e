use super::{Envelope, TileAddress};

/// A tile address together with its world-space envelope.
///
/// For wrapped tiles the envelope is the unwrapped one, i.e. it lies outside the world bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileExtent {
	pub address: TileAddress,
	pub envelope: Envelope,
}

impl TileExtent {
	#[must_use]
	pub fn new(address: TileAddress, envelope: Envelope) -> TileExtent {
		TileExtent { address, envelope }
	}
}
