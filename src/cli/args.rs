use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::scan::ScanMode;

#[derive(Parser, Debug)]
#[command(name = "cellpack")]
#[command(version, about = "Cell-grid sprite atlas packer", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack source images into an atlas PNG plus a metadata document
    Pack(PackArgs),
    /// Print a summary of a metadata document
    Info(InfoArgs),
    /// Reconstruct original images from an atlas and its metadata
    Extract(ExtractArgs),
    /// Emit the render geometry for one packed image as JSON
    Mesh(MeshArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Input image files or directories
    #[arg(required_unless_present = "config")]
    pub input: Vec<PathBuf>,

    /// Load settings from a .cellpack config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for atlas files [default: .]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base name for output files (atlas.png, atlas.json) [default: atlas]
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Packing cell edge length in pixels [default: 16]
    #[arg(long)]
    pub cell_size: Option<u32>,

    /// Border reserved around each cell in pixels [default: 1]
    #[arg(short, long)]
    pub padding: Option<u32>,

    /// Maximum atlas width in pixels [default: 4096]
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Occupancy predicate for the cell scan [default: opaque]
    #[arg(long, value_enum)]
    pub scan_mode: Option<ScanMode>,

    /// Store this string in the metadata instead of the input timestamp
    #[arg(long)]
    pub extra: Option<String>,

    /// Compress PNG output (0-6). Default level is 2 if flag is present without value.
    #[arg(
        long,
        value_name = "LEVEL",
        default_missing_value = "2",
        num_args = 0..=1,
        value_parser = clap::value_parser!(u8).range(0..=6)
    )]
    pub compress: Option<u8>,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Metadata document to inspect
    pub metadata: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Metadata document describing the atlas
    pub metadata: PathBuf,

    /// Atlas PNG built from that document
    pub atlas: PathBuf,

    /// Reconstruct only the image at this index (all images by default)
    #[arg(short, long)]
    pub index: Option<usize>,

    /// Output directory for reconstructed images [default: .]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MeshArgs {
    /// Metadata document describing the atlas
    pub metadata: PathBuf,

    /// Atlas PNG, used for its dimensions
    pub atlas: PathBuf,

    /// Packed image to emit geometry for
    #[arg(short, long)]
    pub index: usize,

    /// Output file for the vertex JSON [default: mesh.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
