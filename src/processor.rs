//! Background removal pipeline
//!
//! [`BackgroundRemover`] ties the pieces together: image-to-tensor
//! preparation, backend inference, mask extraction, and alpha application.
//! The backend is injected, so the pipeline runs identically against ONNX
//! Runtime and against the mock backend used in tests.

use crate::{
    config::RemoverConfig,
    error::{CutoutError, Result},
    inference::SegmentationBackend,
    types::{CutoutResult, ForegroundMask, RemovalTimings},
    utils::{LetterboxGeometry, TensorPreprocessor},
};
use image::{DynamicImage, RgbaImage};
use instant::Instant;
use ndarray::Array4;
use tracing::{debug, info, instrument, span, Level};

/// Pipeline that produces a [`CutoutResult`] from an input image
pub struct BackgroundRemover {
    config: RemoverConfig,
    backend: Box<dyn SegmentationBackend>,
    initialized: bool,
}

impl BackgroundRemover {
    /// Create a remover backed by ONNX Runtime for the configured model
    ///
    /// # Errors
    /// - Model resolution failures
    /// - No inference backend compiled in
    pub fn new(config: RemoverConfig) -> Result<Self> {
        #[cfg(feature = "onnx")]
        {
            let model = crate::models::ModelManager::from_spec(&config.model_spec)?;
            let backend = Box::new(crate::backends::OnnxBackend::new(model));
            Ok(Self::with_backend(config, backend))
        }
        #[cfg(not(feature = "onnx"))]
        {
            let _ = &config;
            Err(CutoutError::invalid_config(
                "No inference backend available; enable the `onnx` feature or inject a backend",
            ))
        }
    }

    /// Create a remover with an injected backend
    #[must_use]
    pub fn with_backend(config: RemoverConfig, backend: Box<dyn SegmentationBackend>) -> Self {
        Self {
            config,
            backend,
            initialized: false,
        }
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &RemoverConfig {
        &self.config
    }

    /// Whether the backend has been initialized
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the backend (loads the model on first use)
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        info!(model = %self.config.model_spec.source.display_name(), "initializing background remover");
        let load_time = self.backend.initialize(&self.config)?;
        if let Some(elapsed) = load_time {
            let load_ms = elapsed.as_millis() as u64;
            debug!(load_ms, "model loaded");
        }
        self.initialized = true;
        Ok(())
    }

    /// Remove the background from an image
    #[instrument(
        skip(self, image),
        fields(
            model = %self.config.model_spec.source.display_name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process(&mut self, image: &DynamicImage) -> Result<CutoutResult> {
        if !self.initialized {
            self.initialize()?;
        }

        let mut timings = RemovalTimings::default();
        let total_start = Instant::now();
        let original_dimensions = (image.width(), image.height());

        let profile = self.backend.preprocessing_profile();

        let input_tensor = {
            let _span = span!(Level::DEBUG, "preprocessing").entered();
            let preprocess_start = Instant::now();
            let tensor = TensorPreprocessor::image_to_tensor(image, &profile)?;
            timings.preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;
            tensor
        };

        let output_tensor = {
            let _span = span!(Level::INFO, "inference").entered();
            let inference_start = Instant::now();
            let tensor = self.backend.infer(&input_tensor)?;
            timings.inference_ms = inference_start.elapsed().as_millis() as u64;
            tensor
        };

        let (mask, result_image) = {
            let _span = span!(Level::DEBUG, "mask_application").entered();
            let postprocess_start = Instant::now();
            let mask = Self::tensor_to_mask(&output_tensor, original_dimensions)?;
            let result_image = Self::apply_mask(image, &mask);
            timings.postprocessing_ms = postprocess_start.elapsed().as_millis() as u64;
            (mask, result_image)
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        info!(
            total_ms = timings.total_ms,
            inference_ms = timings.inference_ms,
            "background removal complete"
        );

        Ok(CutoutResult {
            image: result_image,
            mask,
            original_dimensions,
            timings,
        })
    }

    /// Remove the background from encoded image bytes
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<CutoutResult> {
        let image = crate::services::ImageLoader::load_from_bytes(image_bytes)?;
        self.process(&image)
    }

    /// Remove the background from an image file
    pub fn process_path<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<CutoutResult> {
        let image = crate::services::ImageLoader::load_from_path(path)?;
        self.process(&image)
    }

    /// Project the model's output tensor back onto the original image grid
    fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<ForegroundMask> {
        let shape = tensor.dim();
        if shape.0 != 1 || shape.1 != 1 {
            return Err(CutoutError::processing(format!(
                "Expected (1, 1, H, W) mask tensor, got {shape:?}"
            )));
        }
        let (mask_height, mask_width) = (shape.2 as u32, shape.3 as u32);
        if mask_height != mask_width {
            return Err(CutoutError::processing(format!(
                "Expected square mask tensor, got {mask_width}x{mask_height}"
            )));
        }

        // Invert the letterboxing applied during preprocessing
        let geometry = LetterboxGeometry::compute(original_dimensions, mask_width);
        let (orig_width, orig_height) = original_dimensions;
        let mut mask_data = Vec::with_capacity(orig_width as usize * orig_height as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let (tensor_x, tensor_y) = geometry.to_canvas(x, y);
                let value = if tensor_x < mask_width && tensor_y < mask_height {
                    tensor
                        .get([0, 0, tensor_y as usize, tensor_x as usize])
                        .copied()
                        .unwrap_or(0.0)
                } else {
                    0.0
                };
                mask_data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        ForegroundMask::new(mask_data, original_dimensions)
    }

    /// Use the mask as the alpha channel over the original pixels
    fn apply_mask(image: &DynamicImage, mask: &ForegroundMask) -> RgbaImage {
        let rgba_image = image.to_rgba8();
        let (width, height) = rgba_image.dimensions();
        let mut result = RgbaImage::new(width, height);

        for (x, y, pixel) in rgba_image.enumerate_pixels() {
            let alpha = mask.value_at(x, y);
            if alpha > 0 {
                result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
            } else {
                result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use image::{Rgb, RgbImage};

    fn red_square(size: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([255, 0, 0])))
    }

    fn mock_remover() -> BackgroundRemover {
        BackgroundRemover::with_backend(RemoverConfig::default(), Box::new(MockBackend::new()))
    }

    #[test]
    fn test_process_initializes_lazily() {
        let mut remover = mock_remover();
        assert!(!remover.is_initialized());

        remover.process(&red_square(50)).unwrap();
        assert!(remover.is_initialized());
    }

    #[test]
    fn test_process_keeps_center_drops_corners() {
        let mut remover = mock_remover();
        let result = remover.process(&red_square(100)).unwrap();

        assert_eq!(result.dimensions(), (100, 100));

        let center = result.image.get_pixel(50, 50);
        assert_eq!(center.0[..3], [255, 0, 0]);
        assert!(center.0[3] > 200, "center should be foreground");

        let corner = result.image.get_pixel(0, 0);
        assert_eq!(corner.0[3], 0, "corner should be transparent");
    }

    #[test]
    fn test_process_bytes_round_trip() {
        let mut bytes = Vec::new();
        red_square(40)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();

        let mut remover = mock_remover();
        let result = remover.process_bytes(&bytes).unwrap();
        assert_eq!(result.dimensions(), (40, 40));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let mut remover = BackgroundRemover::with_backend(
            RemoverConfig::default(),
            Box::new(MockBackend::new_failing_inference()),
        );
        let result = remover.process(&red_square(20));
        assert!(matches!(result, Err(CutoutError::Inference(_))));
    }

    #[test]
    fn test_tensor_to_mask_rejects_bad_shapes() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(BackgroundRemover::tensor_to_mask(&tensor, (8, 8)).is_err());

        let tensor = Array4::<f32>::zeros((1, 1, 8, 4));
        assert!(BackgroundRemover::tensor_to_mask(&tensor, (8, 8)).is_err());
    }

    #[test]
    fn test_mask_values_survive_round_trip() {
        // Full-foreground tensor keeps every pixel opaque
        let tensor = Array4::<f32>::from_elem((1, 1, 32, 32), 1.0);
        let mask = BackgroundRemover::tensor_to_mask(&tensor, (16, 16)).unwrap();
        assert!(mask.data.iter().all(|&v| v == 255));
    }
}
