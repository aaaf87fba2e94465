mod format;

pub use format::{load_atlas_image, save_image, write_metadata};
