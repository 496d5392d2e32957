//! Backend implementations for segmentation inference
//!
//! - ONNX Runtime backend (high performance, GPU acceleration)
//! - Mock backend (deterministic mask, no model files; used by tests)

#[cfg(feature = "onnx")]
pub mod onnx;

pub mod mock;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

pub use self::mock::MockBackend;
