//! Border layer painting and final compositing
//!
//! The border color is painted on every mask pixel of an empty layer and the
//! padded content is then composited *over* that layer. Since the mask covers
//! the content's silhouette, opaque content hides the border beneath it and
//! only the dilated ring stays visible. Partially transparent content pixels
//! blend with the border color instead of replacing it.

use image::{Rgba, RgbaImage};

use super::mask::BinaryMask;
use super::types::{BorderError, Result};

/// Paints and composites the border
pub struct Compositor;

impl Compositor {
    /// Transparent layer with `color` on every pixel set in `mask`
    pub fn paint_border(mask: &BinaryMask, color: Rgba<u8>) -> RgbaImage {
        let (width, height) = mask.dimensions();
        let mut layer = RgbaImage::new(width, height);

        for (pixel, _) in layer
            .pixels_mut()
            .zip(mask.values())
            .filter(|(_, value)| **value > 0)
        {
            *pixel = color;
        }

        layer
    }

    /// Paint the border layer and composite `canvas` over it
    pub fn compose(mask: &BinaryMask, canvas: &RgbaImage, color: Rgba<u8>) -> Result<RgbaImage> {
        if mask.dimensions() != canvas.dimensions() {
            return Err(BorderError::processing(
                "compositing",
                format!(
                    "mask is {:?} but canvas is {:?}",
                    mask.dimensions(),
                    canvas.dimensions()
                ),
            ));
        }

        let mut layer = Self::paint_border(mask, color);
        for (below, above) in layer.pixels_mut().zip(canvas.pixels()) {
            *below = over(*above, *below);
        }
        Ok(layer)
    }
}

/// Porter-Duff "over" in 8-bit integer math, rounded to nearest.
///
/// Opaque backgrounds stay opaque for every foreground alpha.
pub fn over(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
    let fa = u32::from(fg.0[3]);
    match fa {
        255 => return fg,
        0 => return bg,
        _ => {}
    }

    // Weights scaled by 255
    let fg_weight = fa * 255;
    let bg_weight = u32::from(bg.0[3]) * (255 - fa);
    let total = fg_weight + bg_weight;

    let channel = |i: usize| {
        let sum = u32::from(fg.0[i]) * fg_weight + u32::from(bg.0[i]) * bg_weight;
        ((sum + total / 2) / total) as u8
    };
    let alpha = ((total + 127) / 255) as u8;

    Rgba([channel(0), channel(1), channel(2), alpha])
}
