use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use cellpack::atlas::AtlasPacker;
use cellpack::cli::{CliArgs, Command, ExtractArgs, InfoArgs, MeshArgs, PackArgs};
use cellpack::config::LoadedConfig;
use cellpack::output::{load_atlas_image, save_image, write_metadata};
use cellpack::reader::{AtlasReader, Vertex};
use cellpack::scan::ScanMode;
use cellpack::source::{load_images, newest_timestamp};

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Use eprintln instead of error! because logger may not be initialized
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        Command::Pack(args) => pack(args),
        Command::Info(args) => info_cmd(args),
        Command::Extract(args) => extract(args),
        Command::Mesh(args) => mesh(args),
    }
}

fn pack(args: PackArgs) -> Result<()> {
    let merged = merge_config_with_args(&args)?;

    info!("cellpack v{}", env!("CARGO_PKG_VERSION"));

    if !merged.output.exists() {
        fs::create_dir_all(&merged.output)?;
    }

    let images = load_images(&merged.input)?;
    info!("Loaded {} images", images.len());

    let extra = match args.extra {
        Some(extra) => extra,
        None => newest_timestamp(&images)
            .map(|t| t.to_string())
            .unwrap_or_default(),
    };

    let mut packer = AtlasPacker::new(merged.cell_size, merged.cell_padding)
        .max_width(merged.max_width)
        .scan_mode(merged.scan_mode);

    for source in images {
        let mut attrs = serde_json::Map::new();
        attrs.insert("name".into(), serde_json::Value::from(source.name));
        packer.add_image(source.image, attrs);
    }

    let atlas = packer.build_atlas()?;
    let doc = packer.build_metadata(&extra);

    let png_path = merged.output.join(format!("{}.png", merged.name));
    save_image(&atlas, &png_path, merged.compress)?;
    info!("Saved {}", png_path.display());

    let json_path = merged.output.join(format!("{}.json", merged.name));
    write_metadata(&doc, &json_path)?;
    info!("Saved {}", json_path.display());

    Ok(())
}

fn info_cmd(args: InfoArgs) -> Result<()> {
    let reader = load_reader(&args.metadata)?;

    info!(
        "{}: {} items, cell size {}, padding {}, extra '{}'",
        args.metadata.display(),
        reader.image_count(),
        reader.cell_size(),
        reader.cell_padding(),
        reader.extra(),
    );

    for index in 0..reader.image_count() {
        let (width, height) = reader.image_size(index)?;
        let cells = reader.vertex_count(index)? / 6;
        let name = reader
            .image_extra(index)?
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        info!(
            "  [{}] {}x{}, {} cells, name '{}'",
            index, width, height, cells, name
        );
    }

    Ok(())
}

fn extract(args: ExtractArgs) -> Result<()> {
    let reader = load_reader(&args.metadata)?;
    let atlas = load_atlas_image(&args.atlas)?;
    let output = args.output.unwrap_or_else(|| PathBuf::from("."));

    if !output.exists() {
        fs::create_dir_all(&output)?;
    }

    let indices: Vec<usize> = match args.index {
        Some(index) => vec![index],
        None => (0..reader.image_count()).collect(),
    };

    let mut used_stems = std::collections::HashSet::new();
    for index in indices {
        let image = reader.reconstruct(&atlas, index)?;
        let name = reader
            .image_extra(index)?
            .get("name")
            .and_then(|v| v.as_str());
        let stem = output_stem(name, index, &mut used_stems);

        let path = output.join(format!("{}.png", stem));
        save_image(&image, &path, None)?;
        info!("Reconstructed {}", path.display());
    }

    Ok(())
}

/// Pick an output file stem for a reconstructed image.
///
/// Item names come from an uninterpreted attribute, so two items may carry
/// the same name (same file stem in different input directories). The
/// second taker falls back to an index-based stem instead of overwriting
/// the first one's output.
fn output_stem(
    name: Option<&str>,
    index: usize,
    used: &mut std::collections::HashSet<String>,
) -> String {
    match name {
        Some(name) if !name.is_empty() && used.insert(name.to_string()) => name.to_string(),
        _ => {
            let fallback = format!("image_{}", index);
            used.insert(fallback.clone());
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_output_stem_unique_names_pass_through() {
        let mut used = HashSet::new();
        assert_eq!(output_stem(Some("hair"), 0, &mut used), "hair");
        assert_eq!(output_stem(Some("body"), 1, &mut used), "body");
    }

    #[test]
    fn test_output_stem_duplicate_name_falls_back_to_index() {
        // same stem from two input directories must not overwrite
        let mut used = HashSet::new();
        assert_eq!(output_stem(Some("base"), 0, &mut used), "base");
        assert_eq!(output_stem(Some("base"), 1, &mut used), "image_1");
        assert_eq!(output_stem(Some("base"), 2, &mut used), "image_2");
    }

    #[test]
    fn test_output_stem_missing_name_uses_index() {
        let mut used = HashSet::new();
        assert_eq!(output_stem(None, 4, &mut used), "image_4");
        assert_eq!(output_stem(Some(""), 5, &mut used), "image_5");
    }
}

fn mesh(args: MeshArgs) -> Result<()> {
    let reader = load_reader(&args.metadata)?;
    let atlas = load_atlas_image(&args.atlas)?;

    let count = reader.vertex_count(args.index)?;
    let mut vertices = vec![
        Vertex {
            position: [0.0; 3],
            uv: [0.0; 2],
        };
        count
    ];
    reader.build_vertices(atlas.width(), atlas.height(), args.index, &mut vertices)?;

    let path = args.output.unwrap_or_else(|| PathBuf::from("mesh.json"));
    let content = serde_json::to_string_pretty(&vertices)?;
    fs::write(&path, content)
        .with_context(|| format!("failed to write mesh file: {}", path.display()))?;
    info!("Wrote {} vertices to {}", count, path.display());

    Ok(())
}

fn load_reader(path: &std::path::Path) -> Result<AtlasReader> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read metadata: {}", path.display()))?;
    AtlasReader::load(&text)
        .with_context(|| format!("failed to load metadata: {}", path.display()))
}

/// Merged configuration from CLI args and optional config file.
struct MergedConfig {
    input: Vec<PathBuf>,
    output: PathBuf,
    name: String,
    cell_size: u32,
    cell_padding: u32,
    max_width: u32,
    scan_mode: ScanMode,
    compress: Option<u8>,
}

/// Merge config file values with CLI arguments.
/// CLI arguments always take precedence over config values.
fn merge_config_with_args(args: &PackArgs) -> Result<MergedConfig> {
    let loaded_config = if let Some(config_path) = &args.config {
        Some(
            LoadedConfig::load(config_path)
                .with_context(|| format!("failed to load config: {}", config_path.display()))?,
        )
    } else {
        None
    };

    let input = if !args.input.is_empty() {
        args.input.clone()
    } else if let Some(ref lc) = loaded_config {
        lc.resolve_inputs()
            .context("failed to resolve input files from config")?
    } else {
        // This shouldn't happen due to clap's required_unless_present
        Vec::new()
    };

    let output = args.output.clone().unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.resolve_output_dir())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let name = args.name.clone().unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.name.clone())
            .unwrap_or_else(|| "atlas".to_string())
    });

    let cell_size = args.cell_size.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.cell_size)
            .unwrap_or(16)
    });

    let cell_padding = args.padding.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.cell_padding)
            .unwrap_or(1)
    });

    let max_width = args.max_width.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.config.max_width)
            .unwrap_or(4096)
    });

    // scan_mode and compress are validated when the config file loads
    let scan_mode = args.scan_mode.unwrap_or_else(|| {
        loaded_config
            .as_ref()
            .map(|lc| lc.scan_mode())
            .unwrap_or(ScanMode::OpaqueOnly)
    });

    let compress = if args.compress.is_some() {
        args.compress
    } else {
        loaded_config.as_ref().and_then(|lc| lc.config.compress)
    };

    Ok(MergedConfig {
        input,
        output,
        name,
        cell_size,
        cell_padding,
        max_width,
        scan_mode,
        compress,
    })
}
