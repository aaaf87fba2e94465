use serde::{Deserialize, Serialize};

/// Cellpack configuration file structure.
///
/// All paths in the config are relative to the config file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CellpackConfig {
    /// Config file version (currently 1)
    pub version: u32,
    /// Input file paths or glob patterns
    pub input: Vec<String>,
    /// Output directory for atlas files
    pub output_dir: String,
    /// Base name for output files (atlas.png, atlas.json)
    pub name: String,
    /// Edge length of the square packing cell, in pixels
    pub cell_size: u32,
    /// Border reserved around each cell, in pixels
    pub cell_padding: u32,
    /// Maximum atlas width in pixels
    pub max_width: u32,
    /// Occupancy predicate: "opaque" or "non-black"
    pub scan_mode: String,
    /// PNG compression preset 0-6 (optional)
    pub compress: Option<u8>,
}

impl Default for CellpackConfig {
    fn default() -> Self {
        Self {
            version: 1,
            input: Vec::new(),
            output_dir: ".".to_string(),
            name: "atlas".to_string(),
            cell_size: 16,
            cell_padding: 1,
            max_width: 4096,
            scan_mode: "opaque".to_string(),
            compress: None,
        }
    }
}
