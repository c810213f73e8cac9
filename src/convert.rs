//! Conversion of uploaded images to PNG
//!
//! The border pipeline works on PNG input. Anything else the `image` crate
//! can decode is re-encoded as PNG next to the original and gets a
//! `convert_to_png` history entry in its sidecar.

use image::{DynamicImage, ImageFormat, ImageResult};
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::{format_name, MetadataError, MetadataStore};

/// Operation name recorded in the processing history
pub const CONVERT_OPERATION: &str = "convert_to_png";

/// Conversion error types
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Not a valid image file: {0}")]
    NotAnImage(PathBuf),

    #[error("Failed to convert {path} to PNG: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to update metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Whether `path` holds a decodable image
pub fn is_image(path: &Path) -> bool {
    open_image(path).is_ok()
}

/// Decode `path`, taking the format from its content rather than its
/// extension (uploads are stored without one)
pub fn open_image(path: &Path) -> ImageResult<DynamicImage> {
    image::ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Format of the file at `path`, guessed from its content
pub fn detect_format(path: &Path) -> Option<ImageFormat> {
    image::ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .format()
}

/// Convert `path` to PNG unless it already is one.
///
/// Returns the path of the PNG: `path` itself when no conversion was needed,
/// otherwise `path` with its extension replaced by `.png`.
pub fn convert_to_png(path: &Path) -> Result<PathBuf> {
    let Some(format) = detect_format(path) else {
        return Err(ConversionError::NotAnImage(path.to_path_buf()));
    };
    if format == ImageFormat::Png {
        tracing::debug!(path = %path.display(), "already PNG, no conversion needed");
        return Ok(path.to_path_buf());
    }

    let image = open_image(path).map_err(|_| ConversionError::NotAnImage(path.to_path_buf()))?;
    let output = path.with_extension("png");

    image
        .save_with_format(&output, ImageFormat::Png)
        .map_err(|source| ConversionError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    let mut metadata = MetadataStore::load(path)?;
    metadata.format = format_name(Some(ImageFormat::Png));
    metadata.record(
        CONVERT_OPERATION,
        json!({
            "original_format": format_name(Some(format)),
            "new_format": "PNG",
        }),
    );
    MetadataStore::save(&output, &mut metadata)?;

    tracing::info!(
        from = %path.display(),
        to = %output.display(),
        original_format = ?format,
        "converted image to PNG"
    );
    Ok(output)
}
