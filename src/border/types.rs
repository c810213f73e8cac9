//! Common types for the border module

use image::Rgba;
use serde::Serialize;
use thiserror::Error;

use crate::convert::ConversionError;
use crate::metadata::MetadataError;

/// Boxed error used as the `source` of processing failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`BorderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied a value outside the accepted domain
    InvalidParameter,
    /// I/O, decode, encode or metadata failure during a run
    ProcessingFailure,
    /// Anything not classified above
    UnexpectedFailure,
}

/// Border processing error types
#[derive(Debug, Error)]
pub enum BorderError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing failed during {stage}: {source}")]
    ProcessingFailure {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Unexpected error: {0}")]
    UnexpectedFailure(String),
}

impl BorderError {
    /// Wrap an underlying error with the name of the failing stage
    pub fn processing(stage: &'static str, source: impl Into<BoxError>) -> Self {
        BorderError::ProcessingFailure {
            stage,
            source: source.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        BorderError::InvalidParameter(message.into())
    }

    /// Kind of this error, for callers that branch on it
    pub fn kind(&self) -> ErrorKind {
        match self {
            BorderError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            BorderError::ProcessingFailure { .. } => ErrorKind::ProcessingFailure,
            BorderError::UnexpectedFailure(_) => ErrorKind::UnexpectedFailure,
        }
    }

    /// Name of the failing stage, if this is a processing failure
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            BorderError::ProcessingFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<MetadataError> for BorderError {
    fn from(err: MetadataError) -> Self {
        BorderError::processing("metadata", err)
    }
}

impl From<ConversionError> for BorderError {
    fn from(err: ConversionError) -> Self {
        BorderError::processing("format conversion", err)
    }
}

pub type Result<T> = std::result::Result<T, BorderError>;

/// Inclusive pixel bounds of the visible content of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl BoundingBox {
    /// Box covering every pixel of a `width` x `height` image.
    ///
    /// Both dimensions must be non-zero.
    pub fn whole_image(width: u32, height: u32) -> Self {
        Self {
            top: 0,
            left: 0,
            bottom: height.saturating_sub(1),
            right: width.saturating_sub(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Whether the box lies inside an image of the given size
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.top <= self.bottom && self.left <= self.right && self.right < width && self.bottom < height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

/// Shape of the visible content inside its bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeClass {
    /// Every pixel inside the bounding box is at least partly opaque
    Rectangular,
    /// The bounding box contains transparent pixels
    Irregular,
}

impl std::fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeClass::Rectangular => write!(f, "rectangular"),
            ShapeClass::Irregular => write!(f, "irregular"),
        }
    }
}

/// Result of scanning an image's alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlphaAnalysis {
    pub bounding_box: BoundingBox,
    pub shape: ShapeClass,
    /// No pixel had alpha > 0; `bounding_box` is then the whole image
    pub fully_transparent: bool,
}

/// Validated margin, thickness and color for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderSpec {
    margin_size: u32,
    border_thickness: u32,
    color: Rgba<u8>,
}

impl BorderSpec {
    /// Validate raw caller input.
    ///
    /// Negative sizes, a color without exactly four components, or a
    /// component outside 0-255 yield [`BorderError::InvalidParameter`].
    pub fn new(margin_size: i64, border_thickness: i64, color: &[i64]) -> Result<Self> {
        if margin_size < 0 {
            return Err(BorderError::invalid("Margin size must be non-negative"));
        }
        if border_thickness < 0 {
            return Err(BorderError::invalid("Border thickness must be non-negative"));
        }
        let margin_size = u32::try_from(margin_size)
            .map_err(|_| BorderError::invalid(format!("Margin size {} is too large", margin_size)))?;
        let border_thickness = u32::try_from(border_thickness).map_err(|_| {
            BorderError::invalid(format!("Border thickness {} is too large", border_thickness))
        })?;

        Ok(Self {
            margin_size,
            border_thickness,
            color: validate_color(color)?,
        })
    }

    /// Same as [`BorderSpec::new`] with the color given as `"R,G,B,A"`
    pub fn with_color_str(margin_size: i64, border_thickness: i64, color: &str) -> Result<Self> {
        Self::new(margin_size, border_thickness, &parse_color(color)?)
    }

    pub fn margin_size(&self) -> u32 {
        self.margin_size
    }

    pub fn border_thickness(&self) -> u32 {
        self.border_thickness
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }
}

/// Split a `"R,G,B,A"` string into integer components.
///
/// Only the syntax is checked here; arity and range are checked by
/// [`BorderSpec::new`].
pub fn parse_color(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|_| {
                BorderError::invalid(format!(
                    "Invalid border color format '{}'. Expected 'R,G,B,A' with values between 0-255",
                    value
                ))
            })
        })
        .collect()
}

fn validate_color(components: &[i64]) -> Result<Rgba<u8>> {
    let [r, g, b, a] = components else {
        return Err(BorderError::invalid(format!(
            "Border color must be an RGBA tuple of 4 components, got {}",
            components.len()
        )));
    };

    let mut channels = [0u8; 4];
    for (slot, value) in channels.iter_mut().zip([r, g, b, a]) {
        *slot = u8::try_from(*value).map_err(|_| {
            BorderError::invalid("Border color values must be integers between 0 and 255")
        })?;
    }

    Ok(Rgba(channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_accepts_valid_input() {
        let spec = BorderSpec::new(5, 3, &[0, 255, 0, 255]).unwrap();
        assert_eq!(spec.margin_size(), 5);
        assert_eq!(spec.border_thickness(), 3);
        assert_eq!(spec.color(), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_spec_rejects_negative_margin() {
        let err = BorderSpec::new(-1, 3, &[0, 0, 0, 255]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(err.to_string().contains("Margin"));
    }

    #[test]
    fn test_spec_rejects_negative_thickness() {
        let err = BorderSpec::new(0, -4, &[0, 0, 0, 255]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_spec_rejects_wrong_arity() {
        for color in [&[255, 0, 0][..], &[1, 2, 3, 4, 5][..], &[][..]] {
            let err = BorderSpec::new(1, 1, color).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn test_spec_rejects_out_of_range_component() {
        assert!(BorderSpec::new(1, 1, &[256, 0, 0, 255]).is_err());
        assert!(BorderSpec::new(1, 1, &[0, -1, 0, 255]).is_err());
    }

    #[test]
    fn test_spec_rejects_oversized_margin() {
        let err = BorderSpec::new(i64::MAX, 0, &[0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("255, 0,10,255").unwrap(), vec![255, 0, 10, 255]);
        assert_eq!(parse_color("1,2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_color("red").is_err());
        assert!(parse_color("1,,2,3").is_err());
    }

    #[test]
    fn test_with_color_str() {
        let spec = BorderSpec::with_color_str(20, 100, "255,255,255,255").unwrap();
        assert_eq!(spec.color(), Rgba([255, 255, 255, 255]));

        let err = BorderSpec::with_color_str(20, 100, "255,0,0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_bounding_box_dimensions() {
        let bbox = BoundingBox {
            top: 2,
            left: 3,
            bottom: 11,
            right: 7,
        };
        assert_eq!(bbox.width(), 5);
        assert_eq!(bbox.height(), 10);
        assert!(bbox.contains(3, 2));
        assert!(!bbox.contains(8, 2));
        assert!(bbox.fits_within(8, 12));
        assert!(!bbox.fits_within(7, 12));
    }

    #[test]
    fn test_whole_image_box() {
        let bbox = BoundingBox::whole_image(50, 40);
        assert_eq!(bbox, BoundingBox { top: 0, left: 0, bottom: 39, right: 49 });
        assert_eq!(bbox.width(), 50);
        assert_eq!(bbox.height(), 40);
    }

    #[test]
    fn test_error_kinds() {
        let invalid = BorderError::invalid("bad");
        assert_eq!(invalid.kind(), ErrorKind::InvalidParameter);
        assert_eq!(invalid.stage(), None);

        let failure = BorderError::processing("decode", std::io::Error::other("boom"));
        assert_eq!(failure.kind(), ErrorKind::ProcessingFailure);
        assert_eq!(failure.stage(), Some("decode"));
        assert!(failure.to_string().contains("decode"));
        assert!(failure.to_string().contains("boom"));

        let unexpected = BorderError::UnexpectedFailure("panic".to_string());
        assert_eq!(unexpected.kind(), ErrorKind::UnexpectedFailure);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(ShapeClass::Rectangular.to_string(), "rectangular");
        assert_eq!(ShapeClass::Irregular.to_string(), "irregular");
    }
}
