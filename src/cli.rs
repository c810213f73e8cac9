//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGS: i32 = 2;
    pub const INPUT_NOT_FOUND: i32 = 3;
    pub const PROCESSING_ERROR: i32 = 4;
}

/// Crop transparent images to their content and add a silhouette border
#[derive(Debug, Parser)]
#[command(name = "image-border", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a transparent margin and a border to an image
    Process(ProcessArgs),
    /// Convert an image to PNG
    Convert(ConvertArgs),
    /// Print the metadata sidecar of an image
    Metadata(MetadataArgs),
    /// Show version and environment information
    Info,
    /// Start the HTTP server
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

/// Arguments for `process`
#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input image (PNG or any decodable format)
    pub input: PathBuf,

    /// Output PNG path
    pub output: PathBuf,

    /// Transparent margin in pixels
    #[arg(short, long, allow_negative_numbers = true)]
    pub margin: Option<i64>,

    /// Border thickness in pixels
    #[arg(short, long, allow_negative_numbers = true)]
    pub thickness: Option<i64>,

    /// Border color as R,G,B,A
    #[arg(short, long)]
    pub color: Option<String>,

    /// Config file (defaults to the usual lookup locations)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the plan without processing
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl ProcessArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            margin_size: self.margin,
            border_thickness: self.thickness,
            border_color: self.color.clone(),
        }
    }
}

/// Arguments for `convert`
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Image to convert
    pub input: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Arguments for `metadata`
#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// Image whose sidecar should be printed
    pub image: PathBuf,
}

/// Arguments for `serve`
#[cfg(feature = "web")]
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (defaults to the config file value)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (defaults to the config file value)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Upload limit in megabytes (defaults to the config file value)
    #[arg(long)]
    pub upload_limit: Option<usize>,

    /// Config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
