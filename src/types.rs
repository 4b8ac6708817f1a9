//! Core data types shared by acquisition and expansion

use crate::error::OutpaintError;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncRead;

/// Supported square canvas sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    R256,
    R512,
    R1024,
}

impl Resolution {
    /// Every supported resolution, smallest first
    pub const ALL: [Self; 3] = [Self::R256, Self::R512, Self::R1024];

    /// Canvas side length in pixels
    #[must_use]
    pub const fn side(self) -> u32 {
        match self {
            Self::R256 => 256,
            Self::R512 => 512,
            Self::R1024 => 1024,
        }
    }

    /// Size string in the `WIDTHxHEIGHT` form image-edit APIs expect
    #[must_use]
    pub fn size_spec(self) -> String {
        format!("{0}x{0}", self.side())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::R1024
    }
}

impl TryFrom<u32> for Resolution {
    type Error = OutpaintError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            256 => Ok(Self::R256),
            512 => Ok(Self::R512),
            1024 => Ok(Self::R1024),
            other => Err(OutpaintError::InvalidResolution(other)),
        }
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> Self {
        resolution.side()
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.side())
    }
}

impl std::str::FromStr for Resolution {
    type Err = OutpaintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| OutpaintError::invalid_input(format!("Resolution is not a number: {s}")))?;
        Self::try_from(value)
    }
}

/// Raw encoded image data with the format sniffed from its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    data: Vec<u8>,
    format: Option<ImageFormat>,
}

impl ImageBytes {
    /// Wrap a buffer, inferring the encoding from its magic bytes
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let format = image::guess_format(&data).ok();
        Self { data, format }
    }

    /// Inferred encoding, if the header was recognised
    #[must_use]
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// A caller-supplied upload: declared filename plus a readable stream
pub struct Upload {
    /// Filename as declared by the client, untrusted
    pub filename: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl Upload {
    pub fn new<S, R>(filename: S, reader: R) -> Self
    where
        S: Into<String>,
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            filename: filename.into(),
            reader: Box::new(reader),
        }
    }

    /// Build an upload backed by an in-memory buffer
    pub fn from_bytes<S: Into<String>>(filename: S, data: Vec<u8>) -> Self {
        Self::new(filename, std::io::Cursor::new(data))
    }

    /// Read the whole stream into memory
    pub async fn read_all(mut self) -> std::io::Result<ImageBytes> {
        let mut buffer = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut self.reader, &mut buffer).await?;
        Ok(ImageBytes::new(buffer))
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Paths produced by a full preparation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedImages {
    /// Locally persisted original image
    pub source_path: PathBuf,
    /// White-background canvas with the source centered
    pub expanded_path: PathBuf,
    /// Binary alpha mask aligned with the expanded canvas
    pub mask_path: PathBuf,
    /// Canvas size both outputs were rendered at
    pub resolution: Resolution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_accepts_supported_sizes() {
        for side in [256u32, 512, 1024] {
            let resolution = Resolution::try_from(side).unwrap();
            assert_eq!(resolution.side(), side);
        }
    }

    #[test]
    fn test_resolution_rejects_other_sizes() {
        for side in [0u32, 1, 128, 255, 257, 768, 2048] {
            let err = Resolution::try_from(side).unwrap_err();
            assert!(matches!(err, OutpaintError::InvalidResolution(v) if v == side));
        }
    }

    #[test]
    fn test_resolution_parse_and_size_spec() {
        let resolution: Resolution = "512".parse().unwrap();
        assert_eq!(resolution, Resolution::R512);
        assert_eq!(resolution.size_spec(), "512x512");
        assert!("abc".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_serde_as_integer() {
        let json = serde_json::to_string(&Resolution::R256).unwrap();
        assert_eq!(json, "256");
        let back: Resolution = serde_json::from_str("1024").unwrap();
        assert_eq!(back, Resolution::R1024);
        assert!(serde_json::from_str::<Resolution>("300").is_err());
    }

    #[test]
    fn test_image_bytes_format_inference() {
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let bytes = ImageBytes::new(png_header);
        assert_eq!(bytes.format(), Some(ImageFormat::Png));

        let unknown = ImageBytes::new(b"not an image".to_vec());
        assert_eq!(unknown.format(), None);
        assert_eq!(unknown.len(), 12);
    }

    #[tokio::test]
    async fn test_upload_read_all() {
        let upload = Upload::from_bytes("photo.png", vec![1, 2, 3, 4]);
        assert_eq!(upload.filename, "photo.png");
        let bytes = upload.read_all().await.unwrap();
        assert_eq!(bytes.as_slice(), &[1, 2, 3, 4]);
    }
}
