//! Image-to-tensor preparation
//!
//! Models take a fixed-size square input, so images are letterboxed: resized
//! with the aspect ratio preserved, centered on a padded canvas, then
//! normalized into an NCHW tensor. The same geometry is used in reverse when
//! mapping the predicted mask back onto the original image.

use crate::error::{CutoutError, Result};
use crate::models::PreprocessingProfile;
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Scale and centering used to letterbox an image onto a square canvas
#[derive(Debug, Clone, Copy)]
pub struct LetterboxGeometry {
    /// Uniform scale factor from original to canvas coordinates
    pub scale: f32,
    /// Horizontal centering offset on the canvas
    pub offset_x: u32,
    /// Vertical centering offset on the canvas
    pub offset_y: u32,
    /// Canvas edge length
    pub target_size: u32,
}

impl LetterboxGeometry {
    /// Compute the letterbox geometry for an image of the given dimensions
    #[must_use]
    pub fn compute(original_dimensions: (u32, u32), target_size: u32) -> Self {
        let (orig_width, orig_height) = original_dimensions;
        let target = target_size as f32;

        let scale = (target / orig_width as f32).min(target / orig_height as f32);
        let scaled_width = (orig_width as f32 * scale).round() as u32;
        let scaled_height = (orig_height as f32 * scale).round() as u32;

        Self {
            scale,
            offset_x: (target_size - scaled_width.min(target_size)) / 2,
            offset_y: (target_size - scaled_height.min(target_size)) / 2,
            target_size,
        }
    }

    /// Scaled image dimensions on the canvas
    #[must_use]
    pub fn scaled_dimensions(&self, original_dimensions: (u32, u32)) -> (u32, u32) {
        (
            (original_dimensions.0 as f32 * self.scale).round() as u32,
            (original_dimensions.1 as f32 * self.scale).round() as u32,
        )
    }

    /// Map a pixel in original coordinates to canvas coordinates
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> (u32, u32) {
        (
            (x as f32 * self.scale).round() as u32 + self.offset_x,
            (y as f32 * self.scale).round() as u32 + self.offset_y,
        )
    }
}

/// Converts images into normalized model input tensors
pub struct TensorPreprocessor;

impl TensorPreprocessor {
    /// Prepare an image for inference
    ///
    /// Letterboxes onto a white canvas of the profile's target size and
    /// produces a normalized `(1, 3, S, S)` tensor.
    pub fn image_to_tensor(
        image: &DynamicImage,
        profile: &PreprocessingProfile,
    ) -> Result<Array4<f32>> {
        let target_size = profile.target_size;
        if target_size == 0 {
            return Err(CutoutError::processing(
                "Preprocessing target size must be non-zero",
            ));
        }

        let rgb_image = image.to_rgb8();
        let geometry = LetterboxGeometry::compute(rgb_image.dimensions(), target_size);
        let (scaled_width, scaled_height) = geometry.scaled_dimensions(rgb_image.dimensions());

        let resized = image::imageops::resize(
            &rgb_image,
            scaled_width.max(1),
            scaled_height.max(1),
            image::imageops::FilterType::Triangle,
        );

        // White padding matches the background the models were trained with
        let mut canvas: RgbImage =
            ImageBuffer::from_pixel(target_size, target_size, image::Rgb([255, 255, 255]));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let canvas_x = x + geometry.offset_x;
            let canvas_y = y + geometry.offset_y;
            if canvas_x < target_size && canvas_y < target_size {
                canvas.put_pixel(canvas_x, canvas_y, *pixel);
            }
        }

        Ok(Self::canvas_to_tensor(&canvas, profile))
    }

    fn canvas_to_tensor(canvas: &RgbImage, profile: &PreprocessingProfile) -> Array4<f32> {
        let size = canvas.width() as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        #[allow(clippy::indexing_slicing)]
        // Tensor dimensions are pre-allocated to match the canvas size
        for (y, row) in canvas.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for channel in 0..3 {
                    let normalized = (f32::from(pixel[channel]) / 255.0
                        - profile.normalization_mean[channel])
                        / profile.normalization_std[channel];
                    tensor[[0, channel, y, x]] = normalized;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_profile(target_size: u32) -> PreprocessingProfile {
        PreprocessingProfile {
            target_size,
            ..PreprocessingProfile::default()
        }
    }

    #[test]
    fn test_geometry_square_image_fills_canvas() {
        let geometry = LetterboxGeometry::compute((100, 100), 320);
        assert_eq!(geometry.offset_x, 0);
        assert_eq!(geometry.offset_y, 0);
        assert_eq!(geometry.scaled_dimensions((100, 100)), (320, 320));
    }

    #[test]
    fn test_geometry_wide_image_is_centered_vertically() {
        let geometry = LetterboxGeometry::compute((200, 100), 320);
        assert_eq!(geometry.scaled_dimensions((200, 100)), (320, 160));
        assert_eq!(geometry.offset_x, 0);
        assert_eq!(geometry.offset_y, 80);
    }

    #[test]
    fn test_geometry_round_trips_center_pixel() {
        let geometry = LetterboxGeometry::compute((100, 50), 320);
        let (canvas_x, canvas_y) = geometry.to_canvas(50, 25);
        assert!(canvas_x < 320 && canvas_y < 320);
        // Center of the image maps to the center of the canvas
        assert_eq!(canvas_x, 160);
        assert_eq!(canvas_y, 160);
    }

    #[test]
    fn test_image_to_tensor_shape() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(64, 32, Rgb([255, 0, 0])));
        let tensor = TensorPreprocessor::image_to_tensor(&img, &test_profile(320)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    }

    #[test]
    fn test_image_to_tensor_normalization() {
        // A mid-gray image lands near zero after ImageNet normalization
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(16, 16, Rgb([124, 116, 104])));
        let profile = test_profile(16);
        let tensor = TensorPreprocessor::image_to_tensor(&img, &profile).unwrap();

        for channel in 0..3 {
            let value = tensor[[0, channel, 8, 8]];
            assert!(value.abs() < 0.05, "channel {channel} = {value}");
        }
    }

    #[test]
    fn test_zero_target_size_rejected() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([0, 0, 0])));
        assert!(TensorPreprocessor::image_to_tensor(&img, &test_profile(0)).is_err());
    }
}
