//! Image input
//!
//! Decoding is delegated entirely to the `image` crate; this service adds
//! path handling, extension filtering, and a content-based fallback when the
//! extension lies about the actual format.

use crate::error::{CutoutError, Result};
use image::DynamicImage;
use std::path::Path;

/// Service for loading input images
pub struct ImageLoader;

impl ImageLoader {
    /// Check whether a path carries a supported input extension
    ///
    /// Input is restricted to `.png`, `.jpg`, and `.jpeg`, matched
    /// case-insensitively.
    #[must_use]
    pub fn is_supported_input<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg"))
    }

    /// Load an image from a file path
    ///
    /// Tries extension-based decoding first, then falls back to content-based
    /// format detection when that fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CutoutError::file_io_error(
                "read image file",
                path,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path) {
            Ok(img) => Ok(img),
            Err(open_err) => {
                log::debug!(
                    "extension-based decode failed for {}: {open_err}; trying content detection",
                    path.display()
                );
                let data = std::fs::read(path)
                    .map_err(|e| CutoutError::file_io_error("read image data", path, &e))?;
                Self::load_from_bytes(&data)
            },
        }
    }

    /// Load an image from in-memory bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        Ok(image::load_from_memory(bytes)?)
    }

    /// Load an image from an async reader
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer)
            .await
            .map_err(CutoutError::Io)?;

        Self::load_from_bytes(&buffer)
    }
}
