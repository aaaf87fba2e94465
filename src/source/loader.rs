use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use image::{ImageReader, RgbaImage};
use log::info;
use rayon::prelude::*;

use crate::error::CellpackError;

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// A decoded input image ready for packing
pub struct SourceImage {
    /// Original file path
    pub path: PathBuf,
    /// Identifier carried into the metadata (filename without extension)
    pub name: String,
    /// RGBA8 pixels
    pub image: RgbaImage,
    /// File modification time, feeding the cache token in `extra`
    pub modified: Option<SystemTime>,
}

/// Load all images named by the input paths (files or directories).
///
/// Directories are walked recursively; decoding runs in parallel. The
/// result keeps the caller's path order so pack offsets stay stable
/// between runs over the same inputs.
pub fn load_images(inputs: &[impl AsRef<Path>]) -> Result<Vec<SourceImage>> {
    let paths = collect_image_paths(inputs)?;

    if paths.is_empty() {
        return Err(CellpackError::NoImages.into());
    }

    info!("Loading {} images...", paths.len());

    paths
        .par_iter()
        .map(|path| load_single_image(path))
        .collect()
}

fn collect_image_paths(inputs: &[impl AsRef<Path>]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(CellpackError::InputNotFound(path.to_path_buf()).into());
        }

        if path.is_file() {
            if is_supported_image(path) {
                paths.push(path.to_path_buf());
            }
        } else if path.is_dir() {
            collect_from_directory(path, &mut paths)?;
        }
    }

    Ok(paths)
}

fn collect_from_directory(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .context("Failed to read directory")?
        .collect::<Result<_, _>>()?;
    // read_dir order is platform-dependent; sort for stable pack offsets
    entries.sort_by_key(std::fs::DirEntry::path);

    for entry in entries {
        let path = entry.path();
        if path.is_file() && is_supported_image(&path) {
            paths.push(path);
        } else if path.is_dir() {
            collect_from_directory(&path, paths)?;
        }
    }

    Ok(())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_single_image(path: &Path) -> Result<SourceImage> {
    let image = ImageReader::open(path)
        .map_err(|e| CellpackError::ImageLoad {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .decode()
        .map_err(|e| CellpackError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })?
        .into_rgba8();

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

    Ok(SourceImage {
        path: path.to_path_buf(),
        name,
        image,
        modified,
    })
}

/// Newest modification time across the inputs, as whole seconds since the
/// Unix epoch. This is the cache token the pack command stores in `extra`.
pub fn newest_timestamp(images: &[SourceImage]) -> Option<u64> {
    images
        .iter()
        .filter_map(|img| img.modified)
        .max()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("a.png")));
        assert!(is_supported_image(Path::new("b.JPG")));
        assert!(is_supported_image(Path::new("dir/c.webp")));
        assert!(!is_supported_image(Path::new("d.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }
}
