//! Moments Core - content fingerprinting and compression primitives
//!
//! This crate provides the transport-free building blocks of the photo
//! ingestion pipeline:
//!
//! - Content fingerprinting: a SHA3-256 checksum over the exact stored
//!   bytes plus basic raster metadata (format, width, height) decoded
//!   from the image header
//! - Compression: re-encoding an uploaded image as a quality-reduced
//!   JPEG written to a transient local file for re-upload
//!
//! Both operations are CPU-bound and synchronous; async callers are
//! expected to run them on a blocking pool.
//!
//! # Example
//!
//! ```
//! use moments_core::{fingerprint, ImageKind};
//!
//! # fn example() -> moments_core::Result<()> {
//! let png = {
//!     let mut buf = std::io::Cursor::new(Vec::new());
//!     image::RgbImage::new(4, 3)
//!         .write_to(&mut buf, image::ImageFormat::Png)
//!         .unwrap();
//!     buf.into_inner()
//! };
//!
//! let print = fingerprint(&png)?;
//! assert_eq!(print.kind, ImageKind::Png);
//! assert_eq!((print.width, print.height), (4, 3));
//! # Ok(())
//! # }
//! ```

pub mod compress;
pub mod error;
pub mod fingerprint;

pub use compress::{CompressedFile, Compressor, DEFAULT_COMPRESS_QUALITY};
pub use error::{MomentsError, Result};
pub use fingerprint::{fingerprint, Fingerprint, ImageKind};
