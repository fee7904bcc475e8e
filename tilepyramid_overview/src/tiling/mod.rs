//! Turning features into tiles: the zoom-dependent simplification policy, the per-feature
//! tiler shared by all code paths, and the worker pool used by bulk rebuilds.

mod accumulator;
mod pool;
mod tiler;
mod tolerance;

pub use accumulator::*;
pub use pool::*;
pub use tiler::*;
pub use tolerance::*;
