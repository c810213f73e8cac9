//! Crop-and-pad onto a transparent canvas

use image::{imageops, RgbaImage};

use super::types::{BorderError, BoundingBox, Result};

/// Builds the margin-padded canvas the border is drawn around
pub struct MarginCompositor;

impl MarginCompositor {
    /// Crop `image` to `bounds` and center the crop on a fully transparent
    /// canvas with `margin` pixels of padding on every side.
    ///
    /// Pasting replaces canvas pixels rather than blending with them.
    pub fn compose(image: &RgbaImage, bounds: &BoundingBox, margin: u32) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if !bounds.fits_within(width, height) {
            return Err(BorderError::invalid(format!(
                "Bounding box {:?} does not fit a {}x{} image",
                bounds, width, height
            )));
        }

        let (canvas_width, canvas_height) = Self::canvas_size(bounds, margin)?;

        let content =
            imageops::crop_imm(image, bounds.left, bounds.top, bounds.width(), bounds.height())
                .to_image();

        let mut canvas = RgbaImage::new(canvas_width, canvas_height);
        imageops::replace(&mut canvas, &content, i64::from(margin), i64::from(margin));

        Ok(canvas)
    }

    /// Size of the padded canvas for `bounds` plus `margin` on each side
    pub fn canvas_size(bounds: &BoundingBox, margin: u32) -> Result<(u32, u32)> {
        let pad = margin
            .checked_mul(2)
            .ok_or_else(|| BorderError::invalid(format!("Margin size {} is too large", margin)))?;

        let grow = |extent: u32| {
            extent
                .checked_add(pad)
                .ok_or_else(|| BorderError::invalid("Canvas with margin exceeds the maximum image size"))
        };

        Ok((grow(bounds.width())?, grow(bounds.height())?))
    }
}
