//! Border pipeline
//!
//! [`render`] runs the four image stages in memory. [`BorderProcessor`]
//! wraps it with input validation, decoding, metadata bookkeeping and an
//! all-or-nothing write of the PNG and its sidecar.

use image::{ImageFormat, RgbaImage};
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

use super::composite::Compositor;
use super::extract::AlphaMaskExtractor;
use super::margin::MarginCompositor;
use super::mask::{BorderMaskGenerator, MaskPolicy};
use super::types::{AlphaAnalysis, BorderError, BorderSpec, Result};
use crate::convert::open_image;
use crate::metadata::{ImageMetadata, MetadataStore};

/// Operation name recorded in the processing history
pub const BORDER_OPERATION: &str = "add_margin_and_border";

/// In-memory result of the four image stages
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: RgbaImage,
    pub analysis: AlphaAnalysis,
    pub policy: MaskPolicy,
}

impl Rendered {
    /// Thickness that shaped the border (a third of the request for
    /// rectangular content)
    pub fn thickness_used(&self) -> u32 {
        self.policy.thickness_used()
    }
}

/// Result of a file-level run
#[derive(Debug, Clone)]
pub struct BorderOutcome {
    pub image: RgbaImage,
    pub metadata: ImageMetadata,
    pub analysis: AlphaAnalysis,
    pub thickness_used: u32,
    pub output_path: PathBuf,
    pub sidecar_path: PathBuf,
}

/// Crop `image` to its content, pad it with a transparent margin and draw a
/// border around the silhouette
pub fn render(image: &RgbaImage, spec: &BorderSpec) -> Result<Rendered> {
    let analysis = AlphaMaskExtractor::analyze(image)?;
    if analysis.fully_transparent {
        tracing::warn!("image is fully transparent, using the whole image as content");
    }

    let canvas =
        MarginCompositor::compose(image, &analysis.bounding_box, spec.margin_size())?;
    let border =
        BorderMaskGenerator::generate(&canvas, analysis.shape, spec.border_thickness());
    let composed = Compositor::compose(&border.mask, &canvas, spec.color())?;

    let expected = MarginCompositor::canvas_size(&analysis.bounding_box, spec.margin_size())?;
    if composed.dimensions() != expected {
        return Err(BorderError::UnexpectedFailure(format!(
            "composited image is {:?}, expected {:?}",
            composed.dimensions(),
            expected
        )));
    }

    tracing::debug!(
        bounding_box = ?analysis.bounding_box,
        shape = %analysis.shape,
        thickness_used = border.thickness_used(),
        width = composed.width(),
        height = composed.height(),
        "border rendered"
    );

    Ok(Rendered {
        image: composed,
        analysis,
        policy: border.policy,
    })
}

/// Validate raw parameters and run [`BorderProcessor::process`].
///
/// `border_color` must hold exactly four components in 0-255. Invalid
/// parameters are reported before anything is read or written.
pub fn add_margin_and_border(
    input_path: &Path,
    output_path: &Path,
    margin_size: i64,
    border_thickness: i64,
    border_color: &[i64],
) -> Result<BorderOutcome> {
    let spec = BorderSpec::new(margin_size, border_thickness, border_color)?;
    BorderProcessor::process(input_path, output_path, &spec)
}

/// File-level border processing
pub struct BorderProcessor;

impl BorderProcessor {
    /// Process `input` and write the PNG plus its sidecar to `output`.
    ///
    /// On failure neither file is left half-written. A failure while
    /// replacing the sidecar removes the freshly written image.
    pub fn process(input: &Path, output: &Path, spec: &BorderSpec) -> Result<BorderOutcome> {
        if !input.is_file() {
            return Err(BorderError::processing(
                "input",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Input file not found: {}", input.display()),
                ),
            ));
        }

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            margin = spec.margin_size(),
            thickness = spec.border_thickness(),
            "adding margin and border"
        );

        let mut metadata = Self::load_metadata(input, output)?;

        let image = open_image(input)
            .map_err(|e| BorderError::processing("decode", e))?
            .to_rgba8();

        let rendered = render(&image, spec)?;
        let thickness_used = rendered.thickness_used();

        metadata.describe_png(output, &rendered.image);
        metadata.record(
            BORDER_OPERATION,
            json!({
                "margin_size": spec.margin_size(),
                "border_thickness": thickness_used,
                "border_color": spec.color().0,
            }),
        );

        let sidecar_path = Self::commit(output, &rendered.image, &mut metadata)?;

        tracing::info!(
            width = rendered.image.width(),
            height = rendered.image.height(),
            shape = %rendered.analysis.shape,
            thickness_used,
            "border added"
        );

        Ok(BorderOutcome {
            image: rendered.image,
            metadata,
            analysis: rendered.analysis,
            thickness_used,
            output_path: output.to_path_buf(),
            sidecar_path,
        })
    }

    /// History source: the output's sidecar when re-processing to the same
    /// path, otherwise the input's sidecar or the input image itself
    fn load_metadata(input: &Path, output: &Path) -> Result<ImageMetadata> {
        let source = if MetadataStore::exists(output) { output } else { input };
        Ok(MetadataStore::load(source)?)
    }

    /// Encode both files to temporaries beside `output`, then move them into
    /// place.
    ///
    /// A previous output is copied aside first and put back if either file
    /// fails to land.
    fn commit(output: &Path, image: &RgbaImage, metadata: &mut ImageMetadata) -> Result<PathBuf> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let sidecar_path = MetadataStore::sidecar_path(output);

        let mut encoded = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| BorderError::processing("encode", e))?;
        let json = MetadataStore::to_json(metadata)?;

        let staged_image =
            stage(dir, &encoded).map_err(|e| BorderError::processing("write output", e))?;
        let staged_sidecar =
            stage(dir, json.as_bytes()).map_err(|e| BorderError::processing("write metadata", e))?;
        let previous =
            back_up(dir, output).map_err(|e| BorderError::processing("write output", e))?;

        if let Err(e) = staged_image.persist(output) {
            restore(output, previous);
            return Err(BorderError::processing("write output", e.error));
        }

        if let Err(e) = staged_sidecar.persist(&sidecar_path) {
            restore(output, previous);
            return Err(BorderError::processing("write metadata", e.error));
        }

        Ok(sidecar_path)
    }
}

/// Copy an existing `output` to a temporary beside it
fn back_up(dir: &Path, output: &Path) -> std::io::Result<Option<TempPath>> {
    if !output.is_file() {
        return Ok(None);
    }
    let backup = tempfile::Builder::new()
        .prefix(".previous-")
        .tempfile_in(dir)?
        .into_temp_path();
    std::fs::copy(output, &backup)?;
    Ok(Some(backup))
}

/// Put the previous output back, or remove the new one if there was none
fn restore(output: &Path, previous: Option<TempPath>) {
    let result = match &previous {
        Some(backup) => std::fs::rename(backup, output),
        None if output.exists() => std::fs::remove_file(output),
        None => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, path = %output.display(), "failed to roll back output image");
    }
}

fn stage(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::border::types::{ErrorKind, ShapeClass};
    use image::Rgba;

    fn red_square_on(canvas: u32, x0: u32, size: u32) -> RgbaImage {
        RgbaImage::from_fn(canvas, canvas, |x, y| {
            if (x0..x0 + size).contains(&x) && (x0..x0 + size).contains(&y) {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_render_rectangular() {
        let image = red_square_on(10, 0, 10);
        let spec = BorderSpec::new(5, 3, &[0, 255, 0, 255]).unwrap();

        let rendered = render(&image, &spec).unwrap();
        assert_eq!(rendered.image.dimensions(), (20, 20));
        assert_eq!(rendered.analysis.shape, ShapeClass::Rectangular);
        assert_eq!(rendered.thickness_used(), 1);
        // A one-pixel element draws no visible ring
        assert_eq!(*rendered.image.get_pixel(4, 4), Rgba([0, 0, 0, 0]));
        assert_eq!(*rendered.image.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_render_rectangular_ring() {
        let image = red_square_on(30, 10, 10);
        let spec = BorderSpec::new(4, 9, &[0, 255, 0, 255]).unwrap();

        let rendered = render(&image, &spec).unwrap();
        assert_eq!(rendered.image.dimensions(), (18, 18));
        assert_eq!(rendered.thickness_used(), 3);
        assert_eq!(*rendered.image.get_pixel(3, 3), Rgba([0, 255, 0, 255]));
        assert_eq!(*rendered.image.get_pixel(4, 4), Rgba([255, 0, 0, 255]));
        assert_eq!(*rendered.image.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_render_fully_transparent() {
        let image = RgbaImage::new(50, 50);
        let spec = BorderSpec::new(5, 6, &[0, 0, 255, 255]).unwrap();

        let first = render(&image, &spec).unwrap();
        let second = render(&image, &spec).unwrap();
        assert!(first.analysis.fully_transparent);
        assert_eq!(first.image.dimensions(), (60, 60));
        assert!(first.image.pixels().all(|p| p.0[3] == 0));
        assert_eq!(first.image, second.image);
    }

    #[test]
    fn test_process_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let spec = BorderSpec::new(1, 1, &[0, 0, 0, 255]).unwrap();

        let err = BorderProcessor::process(Path::new("/nonexistent/in.png"), &output, &spec)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingFailure);
        assert_eq!(err.stage(), Some("input"));
        assert!(!output.exists());
    }

    #[test]
    fn test_process_corrupt_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        std::fs::write(&input, b"\x89PNG broken").unwrap();
        let spec = BorderSpec::new(1, 1, &[0, 0, 0, 255]).unwrap();

        let err = BorderProcessor::process(&input, &output, &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingFailure);
        assert!(!output.exists());
        assert!(!MetadataStore::exists(&output));
    }

    #[test]
    fn test_process_into_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        red_square_on(8, 2, 4).save(&input).unwrap();
        let output = dir.path().join("missing").join("out.png");
        let spec = BorderSpec::new(1, 3, &[0, 0, 0, 255]).unwrap();

        let err = BorderProcessor::process(&input, &output, &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingFailure);
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_rerun_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        red_square_on(8, 2, 4).save(&input).unwrap();
        let output = dir.path().join("out.png");

        let first = BorderSpec::new(1, 3, &[0, 0, 0, 255]).unwrap();
        BorderProcessor::process(&input, &output, &first).unwrap();
        let committed = std::fs::read(&output).unwrap();

        // A non-empty directory where the sidecar goes cannot be replaced
        let sidecar = MetadataStore::sidecar_path(&output);
        std::fs::remove_file(&sidecar).unwrap();
        std::fs::create_dir(&sidecar).unwrap();
        std::fs::write(sidecar.join("blocker"), b"x").unwrap();

        let second = BorderSpec::new(6, 3, &[0, 0, 0, 255]).unwrap();
        let err = BorderProcessor::process(&input, &output, &second).unwrap_err();
        assert_eq!(err.stage(), Some("write metadata"));
        assert_eq!(std::fs::read(&output).unwrap(), committed);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "stray temporaries: {:?}", leftovers);
    }

    #[test]
    fn test_failed_first_run_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        red_square_on(8, 2, 4).save(&input).unwrap();
        let output = dir.path().join("out.png");

        let sidecar = MetadataStore::sidecar_path(&output);
        std::fs::create_dir(&sidecar).unwrap();
        std::fs::write(sidecar.join("blocker"), b"x").unwrap();

        let spec = BorderSpec::new(1, 3, &[0, 0, 0, 255]).unwrap();
        assert!(BorderProcessor::process(&input, &output, &spec).is_err());
        assert!(!output.exists());
    }
}
