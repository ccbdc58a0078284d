//! Content fingerprinting for uploaded images.
//!
//! A fingerprint ties the persisted metadata row to the exact bytes
//! that were stored: the checksum is computed over the same in-memory
//! buffer that is handed to the object store, never over a re-read
//! stream.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{MomentsError, Result};

/// Raster formats accepted by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Storage tag persisted on `PhotoDetail.format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "JPG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Webp => "WEBP",
        }
    }

    /// MIME type for the stored object.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-derived identity of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// SHA3-256 over the exact bytes, hex-encoded.
    pub checksum: String,
    /// Decoded format tag.
    pub kind: ImageKind,
    /// Pixel width from the image header.
    pub width: u32,
    /// Pixel height from the image header.
    pub height: u32,
    /// Byte length of the buffer the checksum covers.
    pub size: u64,
}

/// Fingerprint a raw byte buffer.
///
/// Fails with [`MomentsError::UnsupportedFormat`] when the bytes are
/// not decodable as one of the supported raster formats. Deterministic:
/// identical bytes always yield the identical checksum.
pub fn fingerprint(bytes: &[u8]) -> Result<Fingerprint> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MomentsError::Decode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| MomentsError::UnsupportedFormat("unrecognized image header".into()))?;

    let kind = ImageKind::from_format(format)
        .ok_or_else(|| MomentsError::UnsupportedFormat(format!("{format:?}")))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| MomentsError::Decode(e.to_string()))?;

    let checksum = hex::encode(Sha3_256::digest(bytes));

    Ok(Fingerprint {
        checksum,
        kind,
        width,
        height,
        size: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_rgb(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_fingerprint_jpeg_dimensions_and_tag() {
        let bytes = encode_rgb(1000, 800, ImageFormat::Jpeg);
        let print = fingerprint(&bytes).unwrap();

        assert_eq!(print.kind, ImageKind::Jpg);
        assert_eq!(print.kind.as_str(), "JPG");
        assert_eq!(print.width, 1000);
        assert_eq!(print.height, 800);
        assert_eq!(print.size, bytes.len() as u64);
    }

    #[test]
    fn test_fingerprint_png() {
        let bytes = encode_rgb(64, 32, ImageFormat::Png);
        let print = fingerprint(&bytes).unwrap();

        assert_eq!(print.kind, ImageKind::Png);
        assert_eq!((print.width, print.height), (64, 32));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let bytes = encode_rgb(16, 16, ImageFormat::Png);
        let first = fingerprint(&bytes).unwrap();
        let second = fingerprint(&bytes).unwrap();

        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.checksum.len(), 64); // hex-encoded SHA3-256
    }

    #[test]
    fn test_fingerprint_differs_for_different_bytes() {
        let a = encode_rgb(16, 16, ImageFormat::Png);
        let b = encode_rgb(16, 17, ImageFormat::Png);

        assert_ne!(
            fingerprint(&a).unwrap().checksum,
            fingerprint(&b).unwrap().checksum
        );
    }

    #[test]
    fn test_fingerprint_rejects_non_image_bytes() {
        // A text file renamed .jpg is still text
        let err = fingerprint(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MomentsError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_fingerprint_rejects_empty_buffer() {
        let err = fingerprint(&[]).unwrap_err();
        assert!(matches!(err, MomentsError::UnsupportedFormat(_)));
    }
}
