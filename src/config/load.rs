use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::types::CellpackConfig;
use crate::scan::ScanMode;

/// A config file parsed, validated, and anchored to its directory.
///
/// Input patterns and the output directory are relative to the config file
/// location. Bad knob values are rejected here, at load time, so the pack
/// pipeline only ever sees a config it can act on.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed configuration
    pub config: CellpackConfig,
    /// The directory containing the config file
    pub config_dir: PathBuf,
    scan_mode: ScanMode,
}

impl LoadedConfig {
    /// Load and validate a config file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: CellpackConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::from_parts(config, config_dir)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    /// Validate an already parsed configuration.
    fn from_parts(config: CellpackConfig, config_dir: PathBuf) -> Result<Self> {
        if config.cell_size == 0 {
            bail!("cell_size must be positive");
        }

        let scan_mode = match config.scan_mode.as_str() {
            "opaque" => ScanMode::OpaqueOnly,
            "non-black" => ScanMode::NonBlackOnly,
            other => bail!(
                "unknown scan_mode '{}'. Valid values: opaque, non-black",
                other
            ),
        };

        if let Some(level) = config.compress
            && level > 6
        {
            bail!("compress level must be 0-6, got {}", level);
        }

        Ok(Self {
            config,
            config_dir,
            scan_mode,
        })
    }

    /// The occupancy predicate named by the config.
    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// Expand input patterns to concrete file paths.
    ///
    /// Every entry goes through glob, so literal paths and patterns behave
    /// alike: an entry that matches nothing is an error either way. Matches
    /// are sorted within each pattern because pack offsets follow input
    /// order and must not depend on filesystem enumeration.
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut results = Vec::new();

        for pattern in &self.config.input {
            let full_pattern = self.config_dir.join(pattern);

            let mut matches = glob::glob(&full_pattern.to_string_lossy())
                .with_context(|| format!("invalid input pattern: {}", pattern))?
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to read match for pattern: {}", pattern))?;

            if matches.is_empty() {
                bail!("input pattern '{}' matched no files", pattern);
            }

            matches.sort();
            results.extend(matches);
        }

        Ok(results)
    }

    /// Resolve the output directory relative to the config file directory.
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.config_dir.join(&self.config.output_dir)
    }
}
