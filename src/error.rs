use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellpackError {
    #[error("Failed to load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to save image '{path}': {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("No valid images found in input")]
    NoImages,

    #[error("Nothing to pack: no occupied cells in the working set")]
    NothingToPack,

    #[error(
        "No atlas up to {max_width} pixels wide can hold {total_cells} cells \
         of {cell_area}x{cell_area} pixels"
    )]
    AtlasOverflow {
        total_cells: u32,
        cell_area: u32,
        max_width: u32,
    },

    #[error("Malformed metadata document: {0}")]
    MetadataParse(#[from] serde_json::Error),

    #[error("Invalid metadata document: {reason}")]
    MetadataInvalid { reason: String },

    #[error("Image index {index} out of range (document has {count} items)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error(
        "Atlas raster {width}x{height} does not match the metadata: \
         slot {slot} falls outside it"
    )]
    AtlasMismatch { width: u32, height: u32, slot: u32 },

    #[error("Image '{path}' is not {expected} (got {actual})")]
    PixelFormat {
        path: PathBuf,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to compress PNG '{path}': {message}")]
    PngCompress { path: PathBuf, message: String },

    #[error("Input path does not exist: {0}")]
    InputNotFound(PathBuf),
}
