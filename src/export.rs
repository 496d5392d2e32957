//! Export policy: destination format selection, quality mapping, and atomic writes
//!
//! The export path is a stateless request/response operation: callers hand in a
//! processed RGBA image plus an [`ExportRequest`], and the policy decides the
//! encoding, performs it fully in memory, and writes the destination file
//! atomically. A failed encode never leaves a partial file behind.

use crate::error::{CutoutError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default quality setting used when the caller does not pick one
pub const DEFAULT_QUALITY: u8 = 95;

/// Supported export formats, selected by destination file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency; flattened onto a white canvas before encoding)
    Jpeg,
}

impl ExportFormat {
    /// Determine the export format from a destination path's extension
    ///
    /// `.png` maps to PNG and `.jpg`/`.jpeg` to JPEG, matched
    /// case-insensitively. Any other extension (or none at all) is rejected
    /// with [`CutoutError::UnsupportedFormat`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some(other) => Err(CutoutError::unsupported_format(format!(
                ".{other} (expected .png, .jpg, or .jpeg)"
            ))),
            None => Err(CutoutError::unsupported_format(
                "missing file extension (expected .png, .jpg, or .jpeg)",
            )),
        }
    }

    /// Canonical uppercase name of the format
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }

    /// Whether the format can carry an alpha channel
    #[must_use]
    pub fn supports_transparency(self) -> bool {
        matches!(self, Self::Png)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated save request: destination path plus quality setting
///
/// The quality value is a single 1-100 scale serving both formats: JPEG uses
/// it directly as encoder quality, PNG maps it to a compression level via
/// [`png_compression_level`].
#[derive(Debug, Clone)]
pub struct ExportRequest {
    path: PathBuf,
    quality: u8,
}

impl ExportRequest {
    /// Create a new export request
    ///
    /// # Errors
    /// Rejects quality values outside 1-100.
    pub fn new<P: Into<PathBuf>>(path: P, quality: u8) -> Result<Self> {
        if !(1..=100).contains(&quality) {
            return Err(CutoutError::config_value_error("quality", quality, "1-100"));
        }
        Ok(Self {
            path: path.into(),
            quality,
        })
    }

    /// Destination path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Requested quality (1-100)
    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Format implied by the destination extension
    pub fn format(&self) -> Result<ExportFormat> {
        ExportFormat::from_path(&self.path)
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone)]
pub struct ExportReceipt {
    /// Path the file was written to
    pub path: PathBuf,
    /// Format that was encoded
    pub format: ExportFormat,
    /// Size of the written file in bytes
    pub bytes_written: u64,
}

impl std::fmt::Display for ExportReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "saved {} ({} bytes) to {}",
            self.format,
            self.bytes_written,
            self.path.display()
        )
    }
}

/// Map the 1-100 quality scale onto the 0-9 PNG compression-level scale
///
/// `level = clamp(round(quality * 0.09), 0, 9)`. Note the naming mismatch:
/// PNG compression is lossless, so the "quality" slider actually controls
/// compression *effort* here, with higher quality input yielding higher
/// effort. The mapping is kept as-is for compatibility with existing
/// quality settings rather than being reinterpreted.
#[must_use]
pub fn png_compression_level(quality: u8) -> u8 {
    (f32::from(quality) * 0.09).round().clamp(0.0, 9.0) as u8
}

/// Translate a 0-9 compression level to the encoder's effort tiers
fn compression_type_for_level(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Flatten an RGBA image onto an opaque white canvas
///
/// Each output channel is `alpha * src + (1 - alpha) * white`, rounded to the
/// nearest integer. Fully transparent pixels come out pure white and fully
/// opaque pixels keep their original RGB values exactly.
#[must_use]
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            let value = u16::from(channel);
            ((alpha * value + (255 - alpha) * 255 + 127) / 255) as u8
        };
        canvas.put_pixel(
            x,
            y,
            image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }

    canvas
}

/// Encode an RGBA image to bytes in the requested format
///
/// PNG keeps the alpha channel and uses the compression-level mapping; JPEG
/// is flattened onto white first and encoded at the native 1-100 quality.
pub fn encode(image: &RgbaImage, format: ExportFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        ExportFormat::Png => {
            let level = png_compression_level(quality);
            log::debug!("encoding PNG at compression level {level} (quality {quality})");
            let encoder = PngEncoder::new_with_quality(
                std::io::Cursor::new(&mut buffer),
                compression_type_for_level(level),
                FilterType::Adaptive,
            );
            encoder
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| CutoutError::encode("PNG", e))?;
        },
        ExportFormat::Jpeg => {
            log::debug!("encoding JPEG at quality {quality}");
            let flattened = flatten_onto_white(image);
            let mut encoder =
                JpegEncoder::new_with_quality(std::io::Cursor::new(&mut buffer), quality);
            encoder
                .encode_image(&flattened)
                .map_err(|e| CutoutError::encode("JPEG", e))?;
        },
    }

    Ok(buffer)
}

/// Write encoded bytes to the destination atomically
///
/// The bytes land in a temporary file in the destination directory and are
/// renamed into place only once fully written, so a failed write cannot leave
/// a truncated output file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| CutoutError::file_io_error("create output directory", dir, &e))?;

    let mut staging = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| CutoutError::file_io_error("create staging file in", dir, &e))?;
    staging
        .write_all(bytes)
        .map_err(|e| CutoutError::file_io_error("write staging file for", path, &e))?;
    staging
        .persist(path)
        .map_err(|e| CutoutError::file_io_error("persist output file", path, &e.error))?;

    Ok(bytes.len() as u64)
}

/// Encode a processed image and write it to the request's destination
///
/// This is the full export policy: format from extension, quality mapping,
/// white-canvas flattening for JPEG, and an atomic write. On success exactly
/// one file exists at the destination; on failure nothing was written.
pub fn export_image(image: &RgbaImage, request: &ExportRequest) -> Result<ExportReceipt> {
    let format = request.format()?;
    let bytes = encode(image, format, request.quality())?;
    let bytes_written = write_atomic(request.path(), &bytes)?;

    log::info!(
        "exported {} ({} bytes) to {}",
        format,
        bytes_written,
        request.path().display()
    );

    Ok(ExportReceipt {
        path: request.path().to_path_buf(),
        format,
        bytes_written,
    })
}
