mod blob;
mod constants;
mod envelope;
mod tile_address;
mod tile_extent;
mod zoom_set;

pub use blob::*;
pub use constants::*;
pub use envelope::*;
pub use tile_address::*;
pub use tile_extent::*;
pub use zoom_set::*;
