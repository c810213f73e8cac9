//! image-border-processor - silhouette borders for transparent images
//!
//! Crops an RGBA image to its non-transparent content, surrounds it with a
//! transparent margin and draws a colored border that follows the content's
//! outline. Each output PNG gets a `.metadata.json` sidecar recording its
//! dimensions and processing history.
//!
//! # Modules
//!
//! - [`border`] - the four-stage border pipeline
//! - [`metadata`] - sidecar loading, history and saving
//! - [`convert`] - conversion of other formats to PNG
//! - [`config`] - TOML configuration
//! - [`cli`] - command-line definitions
//! - `web` - HTTP service (feature `web`)

pub mod border;
pub mod cli;
pub mod config;
pub mod convert;
pub mod metadata;

#[cfg(feature = "web")]
pub mod web;

pub use border::{
    add_margin_and_border, parse_color, render, AlphaAnalysis, AlphaMaskExtractor, BinaryMask,
    BorderError, BorderMask, BorderMaskGenerator, BorderOutcome, BorderProcessor, BorderSpec,
    BoundingBox, Compositor, ErrorKind, MarginCompositor, MaskPolicy, Rendered, ShapeClass,
    StructuringElement, BORDER_OPERATION,
};
pub use cli::{exit_codes, Cli, Commands, ConvertArgs, MetadataArgs, ProcessArgs};
pub use config::{BorderSettings, CliOverrides, Config, ConfigError};
pub use convert::{convert_to_png, is_image, open_image, ConversionError};
pub use metadata::{ImageMetadata, MetadataError, MetadataStore, ProcessingEntry};

#[cfg(feature = "web")]
pub use cli::ServeArgs;
#[cfg(feature = "web")]
pub use web::{AppState, ServerConfig, WebServer};
