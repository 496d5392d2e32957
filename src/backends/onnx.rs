//! ONNX Runtime backend
//!
//! Runs segmentation models through ONNX Runtime with support for CPU, CUDA,
//! and CoreML execution providers. Provider selection falls back to CPU when
//! the requested accelerator is unavailable.

use crate::config::{ExecutionProvider, RemoverConfig};
use crate::error::{CutoutError, Result};
use crate::inference::SegmentationBackend;
use crate::models::{ModelManager, PreprocessingProfile};
use instant::Duration;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

/// ONNX Runtime backend for segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    model: ModelManager,
    session: Option<Session>,
    initialized: bool,
}

impl OnnxBackend {
    /// Create a backend for a resolved model
    #[must_use]
    pub fn new(model: ModelManager) -> Self {
        Self {
            model,
            session: None,
            initialized: false,
        }
    }

    /// List ONNX Runtime execution providers with availability status
    pub fn list_providers() -> Vec<(String, bool, String)> {
        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    fn load_model(&mut self, config: &RemoverConfig) -> Result<Duration> {
        let load_start = instant::Instant::now();

        let model_data = self.model.load_bytes()?;

        let mut session_builder = Session::builder()
            .map_err(|e| CutoutError::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| CutoutError::inference(format!("Failed to set optimization level: {e}")))?;

        session_builder = match config.execution_provider {
            ExecutionProvider::Auto => {
                let mut providers = Vec::new();

                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("CUDA execution provider is available and will be used");
                    providers.push(cuda_provider.build());
                }

                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("CoreML execution provider is available and will be used");
                    providers.push(coreml_provider.with_subgraphs(true).build());
                }

                if providers.is_empty() {
                    log::info!("no hardware acceleration available, using CPU");
                    session_builder
                } else {
                    session_builder
                        .with_execution_providers(providers)
                        .map_err(|e| {
                            CutoutError::inference(format!(
                                "Failed to set auto execution providers: {e}"
                            ))
                        })?
                }
            },
            ExecutionProvider::Cpu => {
                log::info!("using CPU execution provider");
                session_builder
            },
            ExecutionProvider::Cuda => {
                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("using CUDA execution provider");
                    session_builder
                        .with_execution_providers([cuda_provider.build()])
                        .map_err(|e| {
                            CutoutError::inference(format!(
                                "Failed to set CUDA execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!("CUDA requested but not available, falling back to CPU");
                    session_builder
                }
            },
            ExecutionProvider::CoreMl => {
                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("using CoreML execution provider");
                    session_builder
                        .with_execution_providers([coreml_provider.with_subgraphs(true).build()])
                        .map_err(|e| {
                            CutoutError::inference(format!(
                                "Failed to set CoreML execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!("CoreML requested but not available, falling back to CPU");
                    session_builder
                }
            },
        };

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (intra_threads / 4).max(1)
        };

        let session = session_builder
            .with_parallel_execution(true)
            .map_err(|e| {
                CutoutError::inference(format!("Failed to enable parallel execution: {e}"))
            })?
            .with_intra_threads(intra_threads)
            .map_err(|e| CutoutError::inference(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| CutoutError::inference(format!("Failed to set inter threads: {e}")))?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                CutoutError::inference(format!("Failed to create session from model data: {e}"))
            })?;

        let info = self.model.info()?;
        log::debug!(
            "ONNX session ready: model {} ({}), {intra_threads} intra / {inter_threads} inter threads",
            info.name,
            crate::cache::human_size(info.size_bytes),
        );

        self.session = Some(session);
        self.initialized = true;

        let load_time = load_start.elapsed();
        log::info!(
            "model loaded in {:.0}ms",
            load_time.as_secs_f64() * 1000.0
        );
        Ok(load_time)
    }
}

impl SegmentationBackend for OnnxBackend {
    fn initialize(&mut self, config: &RemoverConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        let load_time = self.load_model(config)?;
        Ok(Some(load_time))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(CutoutError::inference("Backend not initialized"));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| CutoutError::inference("ONNX session not initialized"))?;

        let inference_start = instant::Instant::now();

        let input_value = Value::from_array(input.clone())
            .map_err(|e| CutoutError::processing(format!("Failed to convert input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| CutoutError::processing(format!("ONNX inference failed: {e}")))?;

        // Positional output access keeps us independent of tensor names
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| CutoutError::processing("No output tensors found"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| CutoutError::processing("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| CutoutError::processing(format!("Failed to extract output tensor: {e}")))?;

        let output_shape = output_tensor.shape().to_vec();
        if output_shape.len() != 4 {
            return Err(CutoutError::processing(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let output_data = output_tensor.view().to_owned();
        let result = Array4::from_shape_vec(
            (
                output_shape.first().copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.into_raw_vec_and_offset().0,
        )
        .map_err(|e| CutoutError::processing(format!("Failed to reshape output tensor: {e}")))?;

        log::debug!(
            "inference complete in {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    fn preprocessing_profile(&self) -> PreprocessingProfile {
        self.model.preprocessing_profile().clone()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
