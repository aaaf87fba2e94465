mod args;

pub use args::{CliArgs, Command, ExtractArgs, InfoArgs, MeshArgs, PackArgs};
