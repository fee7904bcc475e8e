//! Tile pyramid (overview) cache for vector feature classes.
//!
//! The [`OverviewEngine`] partitions the geometries of a [`FeatureSource`] into a fixed tile
//! grid per materialized zoom level and stores one serialized [`VectorTile`] per tile in an
//! [`OverviewHost`]. It offers:
//! - a bulk rebuild on a pool of worker threads ([`OverviewEngine::create_overviews`]),
//! - incremental maintenance on feature insert, update and delete ([`FeatureListener`]),
//! - cache-or-compute lookup ([`OverviewEngine::get_tile`]).
//!
//! # Quick start
//! ```rust
//! use std::sync::Arc;
//! use tilepyramid_core::{TileAddress, progress::Progress, tile_envelope};
//! use tilepyramid_geometry::GeometryKind;
//! use tilepyramid_overview::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let features = Arc::new(MemoryFeatureClass::new("roads", GeometryKind::Line));
//!     features.insert_feature(Some(geo::LineString::from(vec![(0.0, 0.0), (1.0e6, 1.0e6)]).into()), Default::default())?;
//!
//!     let engine = OverviewEngine::new(
//!         features.clone(),
//!         Arc::new(MemoryHost::new()),
//!         OverviewConfig::default(),
//!     )?;
//!     let options = OverviewOptions::from_pairs(&[("ZOOM_LEVELS", "0,1,2")])?;
//!     engine.create_overviews(&options, &Progress::silent())?;
//!
//!     let tile = engine.get_tile(TileAddress::new(1, 1, 1), &tile_envelope(1, 1, 1));
//!     assert_eq!(tile.feature_ids().collect::<Vec<_>>(), vec![1]);
//!     Ok(())
//! }
//! ```

mod config;
pub use config::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod feature;
pub use feature::*;

mod host;
pub use host::*;

mod options;
pub use options::*;

pub mod tiling;

pub use tilepyramid_geometry::VectorTile;
