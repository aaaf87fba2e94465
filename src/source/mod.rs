mod loader;

pub use loader::{SourceImage, load_images, newest_timestamp};
