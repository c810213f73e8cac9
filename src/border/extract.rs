//! Alpha channel analysis
//!
//! Finds the bounding box of every pixel with non-zero alpha and decides
//! whether the content fills that box completely.

use image::RgbaImage;

use super::types::{AlphaAnalysis, BorderError, BoundingBox, Result, ShapeClass};

/// Scans the alpha channel of an RGBA image
pub struct AlphaMaskExtractor;

impl AlphaMaskExtractor {
    /// Compute the content bounding box and shape class of `image`.
    ///
    /// A fully transparent image yields the whole-image box, classified as
    /// [`ShapeClass::Irregular`].
    pub fn analyze(image: &RgbaImage) -> Result<AlphaAnalysis> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BorderError::processing(
                "alpha extraction",
                format!("image has no pixels ({}x{})", width, height),
            ));
        }

        let Some(bounding_box) = Self::content_bounds(image) else {
            return Ok(AlphaAnalysis {
                bounding_box: BoundingBox::whole_image(width, height),
                shape: ShapeClass::Irregular,
                fully_transparent: true,
            });
        };

        Ok(AlphaAnalysis {
            bounding_box,
            shape: Self::classify(image, &bounding_box),
            fully_transparent: false,
        })
    }

    /// Minimal box enclosing all pixels with alpha > 0, if any
    pub fn content_bounds(image: &RgbaImage) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;

        for (y, row) in image.rows().enumerate() {
            let mut visible = row
                .enumerate()
                .filter(|(_, pixel)| pixel.0[3] > 0)
                .map(|(x, _)| x as u32);

            let Some(first) = visible.next() else {
                continue;
            };
            let last = visible.last().unwrap_or(first);
            let y = y as u32;

            bounds = Some(match bounds {
                None => BoundingBox {
                    top: y,
                    left: first,
                    bottom: y,
                    right: last,
                },
                Some(b) => BoundingBox {
                    top: b.top,
                    left: b.left.min(first),
                    bottom: y,
                    right: b.right.max(last),
                },
            });
        }

        bounds
    }

    /// Rectangular iff every pixel inside `bounds` has alpha > 0
    pub fn classify(image: &RgbaImage, bounds: &BoundingBox) -> ShapeClass {
        let filled = (bounds.top..=bounds.bottom)
            .all(|y| (bounds.left..=bounds.right).all(|x| image.get_pixel(x, y).0[3] > 0));

        if filled {
            ShapeClass::Rectangular
        } else {
            ShapeClass::Irregular
        }
    }
}
