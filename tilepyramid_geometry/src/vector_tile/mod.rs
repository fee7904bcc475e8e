//! The vector tile encoding: per-feature items in tile-local coordinates, grouped by feature
//! id and serialized into a flat little-endian buffer.

mod geometry_type;
mod item;
mod tile;
mod tiling;

pub use geometry_type::*;
pub use item::*;
pub use tile::*;
pub use tiling::*;
