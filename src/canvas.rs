//! Canvas expansion and outpainting mask derivation
//!
//! The source image is centered on a square white canvas and a matching mask
//! is produced whose opacity marks the pixels that came from the source.
//! Centering uses floor division, so a source larger than the canvas gets a
//! negative offset and is clipped at the canvas bounds rather than rejected.

use crate::error::Result;
use crate::services::ImageIOService;
use crate::types::Resolution;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const KEEP: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Files written by [`CanvasExpander::expand`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionOutput {
    pub expanded_path: PathBuf,
    pub mask_path: PathBuf,
}

/// Offset that centers a span of `dim` pixels inside `canvas`, rounded toward negative infinity
#[must_use]
pub fn centering_offset(canvas: u32, dim: u32) -> i64 {
    (i64::from(canvas) - i64::from(dim)).div_euclid(2)
}

/// Binarize the source alpha: any coverage becomes 255, none stays 0
#[must_use]
pub fn alpha_stencil(source: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(source.width(), source.height(), |x, y| {
        let alpha = source.get_pixel(x, y)[3];
        Luma([if alpha > 0 { 255 } else { 0 }])
    })
}

/// Composite one channel over white using `alpha` as coverage
#[inline]
fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = u32::from(channel);
    let a = u32::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Source-space rectangle `[start, end)` on one axis that lands inside the canvas
fn visible_span(canvas: u32, dim: u32, offset: i64) -> (u32, u32) {
    let start = (-offset).clamp(0, i64::from(dim));
    let end = (i64::from(canvas) - offset).clamp(start, i64::from(dim));
    (start as u32, end as u32)
}

/// Build the expanded canvas and its mask entirely in memory
///
/// Returns `(expanded, mask)`: an opaque RGB canvas with the source composited
/// over white at the centering offset, and an RGBA mask that is opaque white
/// wherever the source alpha is non-zero and fully transparent elsewhere.
#[must_use]
pub fn expand_image(source: &RgbaImage, resolution: Resolution) -> (RgbImage, RgbaImage) {
    let side = resolution.side();
    let (width, height) = source.dimensions();
    let offset_x = centering_offset(side, width);
    let offset_y = centering_offset(side, height);

    let stencil = alpha_stencil(source);
    let mut expanded = RgbImage::from_pixel(side, side, WHITE);
    let mut mask = RgbaImage::new(side, side);

    let (x_start, x_end) = visible_span(side, width, offset_x);
    let (y_start, y_end) = visible_span(side, height, offset_y);

    for sy in y_start..y_end {
        let cy = (i64::from(sy) + offset_y) as u32;
        for sx in x_start..x_end {
            let cx = (i64::from(sx) + offset_x) as u32;

            let Rgba([r, g, b, a]) = *source.get_pixel(sx, sy);
            expanded.put_pixel(
                cx,
                cy,
                Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]),
            );

            if stencil.get_pixel(sx, sy)[0] == 255 {
                mask.put_pixel(cx, cy, KEEP);
            }
        }
    }

    (expanded, mask)
}

/// Output locations for a source: `{stem}_expanded_{res}.png` and `{stem}_mask_{res}.png` beside it
#[must_use]
pub fn output_paths(source_path: &Path, resolution: Resolution) -> ExpansionOutput {
    let dir = source_path.parent().unwrap_or_else(|| Path::new(""));
    let stem = source_path
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());

    ExpansionOutput {
        expanded_path: dir.join(format!("{}_expanded_{}.png", stem, resolution)),
        mask_path: dir.join(format!("{}_mask_{}.png", stem, resolution)),
    }
}

/// Reads a persisted source image and writes its expanded canvas and mask
pub struct CanvasExpander;

impl CanvasExpander {
    /// Expand the image at `source_path` to the given resolution
    ///
    /// Both images are rendered before anything is written, so a decode
    /// failure leaves no output behind. A failed write of either file removes
    /// both outputs. The source file is never modified.
    ///
    /// # Errors
    /// - `ImageDecode` / `Io` if the source cannot be read
    /// - `ImageEncode` / `Io` if either output cannot be written
    pub fn expand<P: AsRef<Path>>(source_path: P, resolution: Resolution) -> Result<ExpansionOutput> {
        let source_path = source_path.as_ref();
        let _span = tracing::info_span!(
            "expand",
            source = %source_path.display(),
            resolution = resolution.side()
        )
        .entered();

        let source = ImageIOService::load_rgba(source_path)?;
        tracing::debug!(
            width = source.width(),
            height = source.height(),
            "Loaded source image"
        );
        if source.width() > resolution.side() || source.height() > resolution.side() {
            tracing::warn!(
                width = source.width(),
                height = source.height(),
                canvas = resolution.side(),
                "Source exceeds canvas, clipping at canvas bounds"
            );
        }

        let (expanded, mask) = expand_image(&source, resolution);
        let output = output_paths(source_path, resolution);

        let written = ImageIOService::save_png(&DynamicImage::ImageRgb8(expanded), &output.expanded_path)
            .and_then(|()| ImageIOService::save_png(&DynamicImage::ImageRgba8(mask), &output.mask_path));
        if let Err(e) = written {
            remove_partial(&output.expanded_path);
            remove_partial(&output.mask_path);
            return Err(e);
        }

        tracing::info!(
            expanded = %output.expanded_path.display(),
            mask = %output.mask_path.display(),
            "Wrote expanded canvas and mask"
        );
        Ok(output)
    }

    /// Validate a raw resolution value, then expand
    ///
    /// # Errors
    /// - `InvalidResolution` before the source is even opened
    pub fn expand_checked<P: AsRef<Path>>(source_path: P, resolution: u32) -> Result<ExpansionOutput> {
        let resolution = Resolution::try_from(resolution)?;
        Self::expand(source_path, resolution)
    }
}

/// Best-effort removal of an output left behind by a failed write
fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

impl From<ExpansionOutput> for (PathBuf, PathBuf) {
    fn from(output: ExpansionOutput) -> Self {
        (output.expanded_path, output.mask_path)
    }
}
