//! Contains the value types of the tile pyramid: envelopes, tile addresses, zoom sets,
//! the world/display transform and the tile enumeration, plus small IO and progress helpers.

mod concurrency;
pub use concurrency::*;

pub mod io;

pub mod progress;

pub mod transform;
pub use transform::*;

pub mod types;
pub use types::*;
