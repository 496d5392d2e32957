//! Core types produced by the background removal pipeline

use crate::error::{CutoutError, Result};
use crate::export::{self, ExportFormat, ExportReceipt, ExportRequest};
use image::{GrayImage, RgbaImage};

/// Per-pixel foreground probability mask, 0 (background) to 255 (foreground)
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    /// Row-major mask values, one byte per pixel
    pub data: Vec<u8>,
    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl ForegroundMask {
    /// Create a mask from raw values
    ///
    /// # Errors
    /// Fails when the buffer length does not match the dimensions.
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(CutoutError::processing(format!(
                "Mask buffer length {} does not match {}x{} dimensions",
                data.len(),
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Mask value at pixel coordinates, 0 outside the mask bounds
    #[must_use]
    pub fn value_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return 0;
        }
        let index = (y * self.dimensions.0 + x) as usize;
        self.data.get(index).copied().unwrap_or(0)
    }

    /// View the mask as a grayscale image
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        GrayImage::from_raw(self.dimensions.0, self.dimensions.1, self.data.clone()).ok_or_else(
            || CutoutError::processing("Mask buffer does not form a valid grayscale image"),
        )
    }

    /// Resample the mask to new dimensions
    pub fn resize(&self, width: u32, height: u32) -> Result<Self> {
        if (width, height) == self.dimensions {
            return Ok(self.clone());
        }
        let gray = self.to_gray_image()?;
        let resized = image::imageops::resize(
            &gray,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Self::new(resized.into_raw(), (width, height))
    }
}

/// Wall-clock timing breakdown of one removal run, in milliseconds
#[derive(Debug, Clone, Default)]
pub struct RemovalTimings {
    /// Image-to-tensor preparation
    pub preprocessing_ms: u64,
    /// Model inference
    pub inference_ms: u64,
    /// Mask extraction and alpha application
    pub postprocessing_ms: u64,
    /// End-to-end
    pub total_ms: u64,
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct CutoutResult {
    /// Processed image with background pixels made transparent
    pub image: RgbaImage,
    /// The foreground mask that was applied as the alpha channel
    pub mask: ForegroundMask,
    /// Dimensions of the input image
    pub original_dimensions: (u32, u32),
    /// Timing breakdown of the run
    pub timings: RemovalTimings,
}

impl CutoutResult {
    /// Image dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Encode the result to bytes in the given format
    pub fn to_bytes(&self, format: ExportFormat, quality: u8) -> Result<Vec<u8>> {
        export::encode(&self.image, format, quality)
    }

    /// Export the result through the export policy
    pub fn export(&self, request: &ExportRequest) -> Result<ExportReceipt> {
        export::export_image(&self.image, request)
    }

    /// Save as PNG with the default quality setting
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<ExportReceipt> {
        let request = ExportRequest::new(path.as_ref(), export::DEFAULT_QUALITY)?;
        self.export(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mask_rejects_mismatched_buffer() {
        assert!(ForegroundMask::new(vec![0; 9], (2, 2)).is_err());
        assert!(ForegroundMask::new(vec![0; 4], (2, 2)).is_ok());
    }

    #[test]
    fn test_mask_value_lookup() {
        let mask = ForegroundMask::new(vec![0, 64, 128, 255], (2, 2)).unwrap();
        assert_eq!(mask.value_at(0, 0), 0);
        assert_eq!(mask.value_at(1, 0), 64);
        assert_eq!(mask.value_at(0, 1), 128);
        assert_eq!(mask.value_at(1, 1), 255);
        // Out of bounds reads as background
        assert_eq!(mask.value_at(5, 5), 0);
    }

    #[test]
    fn test_mask_resize_round_trip_dimensions() {
        let mask = ForegroundMask::new(vec![255; 16], (4, 4)).unwrap();
        let resized = mask.resize(8, 8).unwrap();
        assert_eq!(resized.dimensions, (8, 8));
        assert_eq!(resized.data.len(), 64);
        // Uniform masks stay uniform under resampling
        assert!(resized.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_result_to_bytes_png_round_trip() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 200]));
        let mask = ForegroundMask::new(vec![200; 9], (3, 3)).unwrap();
        let result = CutoutResult {
            image,
            mask,
            original_dimensions: (3, 3),
            timings: RemovalTimings::default(),
        };

        let bytes = result.to_bytes(ExportFormat::Png, 80).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 3));
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 0, 0, 200]);
    }
}
