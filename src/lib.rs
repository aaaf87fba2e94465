pub mod atlas;
pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod reader;
pub mod scan;
pub mod source;

pub use atlas::{AtlasPacker, PackedItem, best_size};
pub use error::CellpackError;
pub use metadata::{AtlasDoc, ItemRecord};
pub use reader::{AtlasReader, Vertex};
pub use scan::{Occupancy, ScanMode, scan};
