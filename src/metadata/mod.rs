//! Metadata sidecar storage
//!
//! Every processed image has a JSON sidecar next to it, named after the
//! image with its extension replaced by `.metadata.json`. The sidecar
//! records the image's dimensions, format and an append-only processing
//! history.
//!
//! # Example
//!
//! ```rust,no_run
//! use image_border_processor::MetadataStore;
//! use serde_json::json;
//! use std::path::Path;
//!
//! let image = Path::new("photo.png");
//! let mut metadata = MetadataStore::load(image).unwrap();
//! metadata.record("inspect", json!({"by": "docs"}));
//! MetadataStore::save(image, &mut metadata).unwrap();
//! ```

mod types;

pub use types::{
    format_name, parse_timestamp, ImageMetadata, MetadataError, ProcessingEntry, Result,
};

use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix replacing the image extension
pub const SIDECAR_EXTENSION: &str = "metadata.json";

/// Reads and writes metadata sidecars
pub struct MetadataStore;

impl MetadataStore {
    /// Sidecar path for an image: `photo.png` -> `photo.metadata.json`
    pub fn sidecar_path(image_path: &Path) -> PathBuf {
        image_path.with_extension(SIDECAR_EXTENSION)
    }

    /// Whether `image_path` already has a sidecar
    pub fn exists(image_path: &Path) -> bool {
        Self::sidecar_path(image_path).is_file()
    }

    /// Load the sidecar of `image_path`, or describe the image afresh if it
    /// has none
    pub fn load(image_path: &Path) -> Result<ImageMetadata> {
        let sidecar = Self::sidecar_path(image_path);
        if sidecar.is_file() {
            tracing::debug!(path = %sidecar.display(), "loading metadata sidecar");
            return Self::read(&sidecar);
        }

        tracing::debug!(image = %image_path.display(), "no sidecar, deriving metadata from image");
        ImageMetadata::from_image(image_path)
    }

    /// Parse a sidecar file
    pub fn read(sidecar: &Path) -> Result<ImageMetadata> {
        let content = std::fs::read_to_string(sidecar)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Stamp `last_modified` and serialize as 2-space indented JSON
    pub fn to_json(metadata: &mut ImageMetadata) -> Result<String> {
        metadata.last_modified = Utc::now();
        Ok(serde_json::to_string_pretty(metadata)?)
    }

    /// Write the sidecar of `image_path`, replacing any previous one
    /// atomically
    pub fn save(image_path: &Path, metadata: &mut ImageMetadata) -> Result<PathBuf> {
        let sidecar = Self::sidecar_path(image_path);
        let json = Self::to_json(metadata)?;

        let dir = sidecar
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(json.as_bytes())?;
        staged.persist(&sidecar).map_err(|e| MetadataError::Io(e.error))?;

        tracing::debug!(path = %sidecar.display(), "metadata sidecar saved");
        Ok(sidecar)
    }
}
