//! Coordinate transforms between world, scene and display space, and the enumeration of
//! the tiles covering an extent.

mod map_transform;
mod tiles;

pub use map_transform::*;
pub use tiles::*;
