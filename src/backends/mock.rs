//! Mock backend producing a deterministic segmentation mask
//!
//! Used for testing the pipeline and export paths without model files or an
//! ONNX Runtime installation. The generated mask is a soft-edged circle
//! centered in the frame: foreground inside, background outside.

use crate::config::RemoverConfig;
use crate::error::{CutoutError, Result};
use crate::inference::SegmentationBackend;
use crate::models::PreprocessingProfile;
use instant::Duration;
use ndarray::Array4;

/// Mock segmentation backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    profile: PreprocessingProfile,
    initialized: bool,
    should_fail_inference: bool,
}

impl MockBackend {
    /// Create a new mock backend with a small input size for fast tests
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile: PreprocessingProfile {
                target_size: 320,
                ..PreprocessingProfile::default()
            },
            initialized: false,
            should_fail_inference: false,
        }
    }

    /// Create a mock backend that fails during inference
    #[must_use]
    pub fn new_failing_inference() -> Self {
        let mut backend = Self::new();
        backend.should_fail_inference = true;
        backend
    }

    /// Generate a soft circular mask matching the input's spatial dimensions
    fn circular_mask(height: usize, width: usize) -> Array4<f32> {
        let mut output = Array4::<f32>::zeros((1, 1, height, width));

        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(10.0);

        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - center_x;
                let dy = y as f32 - center_y;
                let distance = (dx * dx + dy * dy).sqrt();

                // Fully foreground near the center, soft falloff at the rim
                let value = if distance < radius {
                    (2.0 * (radius - distance) / radius).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                output[[0, 0, y, x]] = value;
            }
        }

        output
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationBackend for MockBackend {
    fn initialize(&mut self, _config: &RemoverConfig) -> Result<Option<Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(CutoutError::inference("Mock backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(CutoutError::inference("Mock backend inference failed"));
        }

        let (_n, channels, height, width) = input.dim();
        if channels != 3 {
            return Err(CutoutError::processing(format!(
                "Expected 3-channel input tensor, got {channels}"
            )));
        }

        Ok(Self::circular_mask(height, width))
    }

    fn preprocessing_profile(&self) -> PreprocessingProfile {
        self.profile.clone()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_requires_initialization() {
        let mut backend = MockBackend::new();
        let input = Array4::<f32>::zeros((1, 3, 32, 32));
        assert!(backend.infer(&input).is_err());

        backend.initialize(&RemoverConfig::default()).unwrap();
        let output = backend.infer(&input).unwrap();
        assert_eq!(output.dim(), (1, 1, 32, 32));
    }

    #[test]
    fn test_mask_is_foreground_at_center_background_at_corner() {
        let mut backend = MockBackend::new();
        backend.initialize(&RemoverConfig::default()).unwrap();

        let input = Array4::<f32>::zeros((1, 3, 64, 64));
        let output = backend.infer(&input).unwrap();

        assert!(output[[0, 0, 32, 32]] > 0.9);
        assert!(output[[0, 0, 0, 0]] < f32::EPSILON);
    }

    #[test]
    fn test_failing_backend_reports_inference_error() {
        let mut backend = MockBackend::new_failing_inference();
        backend.initialize(&RemoverConfig::default()).unwrap();

        let input = Array4::<f32>::zeros((1, 3, 16, 16));
        let result = backend.infer(&input);
        assert!(matches!(result, Err(CutoutError::Inference(_))));
    }
}
