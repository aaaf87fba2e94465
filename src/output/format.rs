use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use image::{ImageFormat, ImageReader, RgbaImage};

use crate::error::CellpackError;
use crate::metadata::AtlasDoc;

/// Save an RGBA image as PNG, optionally recompressed with oxipng.
///
/// oxipng is lossless, which the reader depends on: the atlas must
/// round-trip pixel values exactly.
pub fn save_image(image: &RgbaImage, path: &Path, compress: Option<u8>) -> Result<()> {
    let mut png_data = Cursor::new(Vec::new());
    image
        .write_to(&mut png_data, ImageFormat::Png)
        .map_err(|e| CellpackError::ImageSave {
            path: path.to_path_buf(),
            source: e,
        })?;

    let output_data = if let Some(level) = compress {
        let opts = oxipng::Options::from_preset(level);
        oxipng::optimize_from_memory(&png_data.into_inner(), &opts).map_err(|e| {
            CellpackError::PngCompress {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?
    } else {
        png_data.into_inner()
    };

    fs::write(path, output_data).map_err(|e| CellpackError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Load an atlas raster, requiring the RGBA8 layout the reader assumes.
pub fn load_atlas_image(path: &Path) -> Result<RgbaImage> {
    let decoded = ImageReader::open(path)
        .map_err(|e| CellpackError::ImageLoad {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .decode()
        .map_err(|e| CellpackError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Reconstruction is byte-exact; reinterpreting another layout would
    // silently change pixel values, so reject instead of converting.
    match decoded {
        image::DynamicImage::ImageRgba8(image) => Ok(image),
        other => Err(CellpackError::PixelFormat {
            path: path.to_path_buf(),
            expected: "RGBA8",
            actual: format_name(&other),
        }
        .into()),
    }
}

fn format_name(image: &image::DynamicImage) -> &'static str {
    use image::DynamicImage::*;
    match image {
        ImageLuma8(_) => "Luma8",
        ImageLumaA8(_) => "LumaA8",
        ImageRgb8(_) => "RGB8",
        ImageRgba8(_) => "RGBA8",
        ImageLuma16(_) => "Luma16",
        ImageLumaA16(_) => "LumaA16",
        ImageRgb16(_) => "RGB16",
        ImageRgba16(_) => "RGBA16",
        ImageRgb32F(_) => "RGB32F",
        ImageRgba32F(_) => "RGBA32F",
        _ => "unknown",
    }
}

/// Write the metadata document next to the atlas image.
pub fn write_metadata(doc: &AtlasDoc, path: &Path) -> Result<()> {
    let content = doc.to_text()?;
    fs::write(path, content).map_err(|e| CellpackError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
