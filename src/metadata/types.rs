//! Sidecar document types

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Metadata error types
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// One entry of the processing history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEntry {
    pub operation: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Contents of a `.metadata.json` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub filename: String,
    pub format: String,
    pub original_format: String,
    pub width: u32,
    pub height: u32,
    pub has_transparency: bool,
    #[serde(default)]
    pub processing_history: Vec<ProcessingEntry>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_modified: DateTime<Utc>,
    /// Keys written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageMetadata {
    /// Fresh metadata describing the image at `path`, with empty history
    pub fn from_image(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MetadataError::ImageNotFound(path.to_path_buf()));
        }

        let reader = image::ImageReader::open(path)?.with_guessed_format()?;
        let format = format_name(reader.format());
        let image = reader.decode()?;
        let has_transparency =
            image.color().has_alpha() && image.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX);

        Ok(Self {
            filename: file_name(path),
            format: format.clone(),
            original_format: format,
            width: image.width(),
            height: image.height(),
            has_transparency,
            processing_history: Vec::new(),
            last_modified: Utc::now(),
            extra: Map::new(),
        })
    }

    /// Append an operation to the history.
    ///
    /// Timestamps never go backwards, even if the wall clock does.
    pub fn record(&mut self, operation: impl Into<String>, parameters: Value) {
        let now = Utc::now();
        let timestamp = self
            .processing_history
            .last()
            .map_or(now, |last| last.timestamp.max(now));

        self.processing_history.push(ProcessingEntry {
            operation: operation.into(),
            parameters,
            timestamp,
        });
    }

    /// Point the document at a PNG written to `path`
    pub fn describe_png(&mut self, path: &Path, image: &RgbaImage) {
        self.filename = file_name(path);
        self.format = format_name(Some(ImageFormat::Png));
        self.width = image.width();
        self.height = image.height();
        self.has_transparency = image.pixels().any(|p| p.0[3] < u8::MAX);
    }

    /// Last recorded operation, if any
    pub fn last_operation(&self) -> Option<&ProcessingEntry> {
        self.processing_history.last()
    }
}

/// Upper-case format name as stored in sidecars ("PNG", "JPEG", ...)
pub fn format_name(format: Option<ImageFormat>) -> String {
    match format {
        Some(ImageFormat::Png) => "PNG".to_string(),
        Some(ImageFormat::Jpeg) => "JPEG".to_string(),
        Some(ImageFormat::Gif) => "GIF".to_string(),
        Some(ImageFormat::WebP) => "WEBP".to_string(),
        Some(ImageFormat::Bmp) => "BMP".to_string(),
        Some(ImageFormat::Tiff) => "TIFF".to_string(),
        Some(other) => format!("{:?}", other).to_uppercase(),
        None => "UNKNOWN".to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 strings keep their offset; timestamps without an offset are read
/// as local time.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp '{}' does not exist in local time", raw))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use serde_json::json;

    fn sample() -> ImageMetadata {
        ImageMetadata {
            filename: "a.png".to_string(),
            format: "PNG".to_string(),
            original_format: "JPEG".to_string(),
            width: 10,
            height: 20,
            has_transparency: true,
            processing_history: Vec::new(),
            last_modified: Utc::now(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut metadata = sample();
        metadata.record("first", json!({"a": 1}));
        metadata.record("second", Value::Null);

        assert_eq!(metadata.processing_history.len(), 2);
        assert_eq!(metadata.processing_history[0].operation, "first");
        assert_eq!(metadata.last_operation().unwrap().operation, "second");
        assert!(
            metadata.processing_history[0].timestamp <= metadata.processing_history[1].timestamp
        );
    }

    #[test]
    fn test_record_never_goes_backwards() {
        let mut metadata = sample();
        let future = Utc::now() + chrono::Duration::hours(1);
        metadata.processing_history.push(ProcessingEntry {
            operation: "from_the_future".to_string(),
            parameters: Value::Null,
            timestamp: future,
        });

        metadata.record("now", Value::Null);
        assert_eq!(metadata.last_operation().unwrap().timestamp, future);
    }

    #[test]
    fn test_parse_rfc3339_and_naive_timestamps() {
        let utc = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let offset = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(offset, utc);

        assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_deserialize_keeps_unknown_keys() {
        let raw = json!({
            "filename": "input_image",
            "format": "JPEG",
            "original_format": "JPEG",
            "width": 4,
            "height": 3,
            "has_transparency": false,
            "processing_history": [
                {"operation": "convert_to_png", "parameters": null, "timestamp": "2024-01-02T03:04:05.000001"}
            ],
            "last_modified": "2024-01-02T03:04:05",
            "file_size": [4, 3]
        });

        let metadata: ImageMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(metadata.processing_history.len(), 1);
        assert_eq!(metadata.extra.get("file_size"), Some(&json!([4, 3])));

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["file_size"], json!([4, 3]));
        assert_eq!(back["width"], json!(4));
    }

    #[test]
    fn test_missing_history_defaults_to_empty() {
        let raw = json!({
            "filename": "x.png",
            "format": "PNG",
            "original_format": "PNG",
            "width": 1,
            "height": 1,
            "has_transparency": false,
            "last_modified": "2024-01-02T03:04:05Z"
        });
        let metadata: ImageMetadata = serde_json::from_value(raw).unwrap();
        assert!(metadata.processing_history.is_empty());
    }

    #[test]
    fn test_describe_png() {
        let mut metadata = sample();
        let image = RgbaImage::from_pixel(7, 5, Rgba([1, 2, 3, 255]));
        metadata.describe_png(Path::new("/out/result.png"), &image);

        assert_eq!(metadata.filename, "result.png");
        assert_eq!(metadata.format, "PNG");
        assert_eq!(metadata.original_format, "JPEG");
        assert_eq!((metadata.width, metadata.height), (7, 5));
        assert!(!metadata.has_transparency);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(format_name(Some(ImageFormat::Png)), "PNG");
        assert_eq!(format_name(Some(ImageFormat::Jpeg)), "JPEG");
        assert_eq!(format_name(None), "UNKNOWN");
    }

    #[test]
    fn test_from_missing_image() {
        let err = ImageMetadata::from_image(Path::new("/nonexistent/image.png")).unwrap_err();
        assert!(matches!(err, MetadataError::ImageNotFound(_)));
    }
}
