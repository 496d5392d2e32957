//! Inference backend abstraction
//!
//! Background segmentation is an external collaborator behind this trait:
//! the pipeline hands a normalized NCHW tensor in and receives a single
//! channel foreground probability tensor back, without knowing whether a
//! real ONNX session or a test double is on the other side.

use crate::config::RemoverConfig;
use crate::error::Result;
use crate::models::PreprocessingProfile;
use instant::Duration;
use ndarray::Array4;

/// Trait for segmentation inference backends
pub trait SegmentationBackend {
    /// Initialize the backend with the given configuration
    ///
    /// Returns the model load time when a model was actually loaded.
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Model loading or validation errors
    fn initialize(&mut self, config: &RemoverConfig) -> Result<Option<Duration>>;

    /// Run inference on the input tensor
    ///
    /// Input is `(1, 3, H, W)`; output is `(1, 1, H, W)` with values in
    /// `[0, 1]` where higher means more likely foreground.
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Invalid input tensor dimensions
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Tensor preparation parameters this backend's model expects
    fn preprocessing_profile(&self) -> PreprocessingProfile;

    /// Check if the backend is initialized
    fn is_initialized(&self) -> bool;
}
