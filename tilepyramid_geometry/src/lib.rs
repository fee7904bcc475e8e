//! Geometry processing for the tile pyramid: classification, simplification, clipping
//! and the compact vector tile encoding.

pub mod geometry;
pub mod vector_tile;

pub use geometry::*;
pub use vector_tile::*;
