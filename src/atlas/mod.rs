mod packer;
mod size;

pub use packer::{AtlasPacker, PackedItem};
pub(crate) use packer::slot_pixel_origin;
pub use size::best_size;
