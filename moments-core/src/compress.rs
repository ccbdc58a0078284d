//! Image compression to transient local files.
//!
//! The compressed copy is written to local disk so the caller can
//! re-open it for a second object-store upload, then delete it. The
//! original upload stays valid whether or not compression succeeds.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use uuid::Uuid;

use crate::error::{MomentsError, Result};

/// Default JPEG quality for compressed copies.
pub const DEFAULT_COMPRESS_QUALITY: u8 = 75;

/// A compressed asset written to transient storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFile {
    /// Generated file name (`{uuid}.jpg`).
    pub file_name: String,
    /// Full path of the transient file.
    pub path: PathBuf,
}

/// Re-encodes images as quality-reduced JPEGs.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    quality: u8,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESS_QUALITY)
    }
}

impl Compressor {
    /// Create a compressor with a JPEG quality between 1 and 100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Re-encode `bytes` and write the result under `dest_dir`.
    ///
    /// The destination directory is created if absent. Returns the
    /// generated file name and its path; the caller owns deletion of
    /// the file once the copy has been durably stored elsewhere.
    pub fn compress(&self, bytes: &[u8], dest_dir: &Path) -> Result<CompressedFile> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| MomentsError::Decode(e.to_string()))?;

        let mut encoded = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality);
        img.write_with_encoder(encoder)
            .map_err(|e| MomentsError::Encode(e.to_string()))?;

        fs::create_dir_all(dest_dir)?;

        let file_name = format!("{}.jpg", Uuid::new_v4().simple());
        let path = dest_dir.join(&file_name);
        fs::write(&path, encoded.into_inner())?;

        tracing::debug!(file = %path.display(), quality = self.quality, "wrote compressed copy");

        Ok(CompressedFile { file_name, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 200])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_compress_writes_jpeg_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = sample_png(120, 80);

        let out = Compressor::default().compress(&bytes, dir.path()).unwrap();

        assert!(out.file_name.ends_with(".jpg"));
        assert!(out.path.exists());

        // The transient file is itself a decodable JPEG of the same dimensions
        let written = fs::read(&out.path).unwrap();
        let reencoded = image::load_from_memory(&written).unwrap();
        assert_eq!(reencoded.width(), 120);
        assert_eq!(reencoded.height(), 80);
    }

    #[test]
    fn test_compress_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("photo").join("tmp");
        let bytes = sample_png(32, 32);

        let out = Compressor::new(60).compress(&bytes, &nested).unwrap();
        assert!(out.path.starts_with(&nested));
        assert!(out.path.exists());
    }

    #[test]
    fn test_compress_rejects_undecodable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let err = Compressor::default()
            .compress(b"not an image", dir.path())
            .unwrap_err();
        assert!(matches!(err, MomentsError::Decode(_)));
        // Nothing written on failure
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(Compressor::new(0).quality(), 1);
        assert_eq!(Compressor::new(200).quality(), 100);
    }
}
