//! Margin & Border module
//!
//! Crops an RGBA image to its visible content, pads it with a transparent
//! margin and draws a colored border that follows the content's silhouette.
//!
//! # Stages
//!
//! 1. [`AlphaMaskExtractor`] - content bounding box and shape class
//! 2. [`MarginCompositor`] - crop and pad onto a transparent canvas
//! 3. [`BorderMaskGenerator`] - dilated (and for irregular shapes, smoothed) mask
//! 4. [`Compositor`] - paint the mask, composite the content over it
//!
//! # Example
//!
//! ```rust,no_run
//! use image_border_processor::add_margin_and_border;
//! use std::path::Path;
//!
//! let outcome = add_margin_and_border(
//!     Path::new("sticker.png"),
//!     Path::new("sticker_bordered.png"),
//!     200,
//!     100,
//!     &[255, 255, 255, 255],
//! ).unwrap();
//!
//! println!("{}x{}", outcome.image.width(), outcome.image.height());
//! ```

mod composite;
mod extract;
mod margin;
mod mask;
mod pipeline;
mod types;

pub use composite::Compositor;
pub use extract::AlphaMaskExtractor;
pub use margin::MarginCompositor;
pub use mask::{
    dilate, smooth, BinaryMask, BorderMask, BorderMaskGenerator, MaskPolicy, StructuringElement,
    RECT_THICKNESS_DIVISOR, SMOOTH_THRESHOLD,
};
pub use pipeline::{
    add_margin_and_border, render, BorderOutcome, BorderProcessor, Rendered, BORDER_OPERATION,
};
pub use types::{
    parse_color, AlphaAnalysis, BorderError, BorderSpec, BoundingBox, BoxError, ErrorKind,
    Result, ShapeClass,
};

// ============================================================
// Defaults
// ============================================================

/// Default transparent margin in pixels
pub const DEFAULT_MARGIN_SIZE: i64 = 200;

/// Default border thickness in pixels
pub const DEFAULT_BORDER_THICKNESS: i64 = 100;

/// Default border color (opaque white)
pub const DEFAULT_BORDER_COLOR: &str = "255,255,255,255";
