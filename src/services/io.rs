//! Image I/O operations service
//!
//! Keeps decoding and PNG persistence out of the canvas geometry so the
//! expansion algorithm can be exercised purely in memory.

use crate::error::{OutpaintError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Extension-based detection is tried first; files without a usable
    /// extension (e.g. `default_filename`) fall back to sniffing the content.
    ///
    /// # Errors
    /// - `Io` if the file is missing or unreadable
    /// - `ImageDecode` if neither detection method can decode it
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(OutpaintError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                tracing::debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "Extension-based loading failed, attempting content-based detection"
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| OutpaintError::file_io_error("read image data", path_ref, &io_err))?;

                image::load_from_memory(&data).map_err(|source| OutpaintError::ImageDecode {
                    path: path_ref.to_path_buf(),
                    source,
                })
            },
        }
    }

    /// Load an image and normalise it to 8-bit RGBA
    ///
    /// Sources without an alpha channel come back fully opaque.
    pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        Ok(Self::load_image(path)?.into_rgba8())
    }

    /// Save an image as PNG, creating the parent directory if needed
    ///
    /// # Errors
    /// - `Io` if the parent directory cannot be created
    /// - `ImageEncode` if encoding or writing fails
    pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutpaintError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        image
            .save_with_format(path_ref, ImageFormat::Png)
            .map_err(|source| OutpaintError::ImageEncode {
                path: path_ref.to_path_buf(),
                source,
            })
    }
}
