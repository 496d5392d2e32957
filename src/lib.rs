#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Cutout
//!
//! A background removal library and CLI. Images are segmented by an ONNX
//! model (ONNX Runtime backend), the predicted mask becomes the alpha
//! channel, and results export as PNG (alpha preserved) or JPEG (flattened
//! onto white) with a single 1-100 quality control.
//!
//! ## Features
//!
//! - **Segmentation via ONNX Runtime**: CPU, CUDA, and `CoreML` execution
//!   providers with automatic fallback
//! - **Model management**: fetch models over HTTPS into a local store with
//!   integrity bookkeeping
//! - **Alpha-aware export**: PNG keeps transparency; JPEG composites onto an
//!   opaque white canvas before encoding
//! - **Atomic writes**: output files appear fully written or not at all
//! - **Session model**: an explicit load → remove → export cycle that is
//!   unit-testable without any UI
//! - **CLI integration**: optional command-line interface (enable with the
//!   `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cutout::{
//!     BackgroundRemover, EditSession, ExportRequest, ModelFetcher, ModelSource, ModelSpec,
//!     ModelStore, RemoverConfig,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Fetch and store a model (one-time setup)
//! let fetcher = ModelFetcher::new()?;
//! let model_id = fetcher.fetch(ModelStore::default_model_url(), true).await?;
//!
//! // Configure the pipeline
//! let config = RemoverConfig::builder()
//!     .model_spec(ModelSpec {
//!         source: ModelSource::Cached(model_id),
//!     })
//!     .build()?;
//! let mut remover = BackgroundRemover::new(config)?;
//!
//! // One load → remove → export cycle
//! let mut session = EditSession::new();
//! session.load_path("input.jpg")?;
//! session.remove_background(&mut remover)?;
//! session.export(&ExportRequest::new("output.png", 95)?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! All core functionality (fetching, storing, processing, exporting) is
//! available by default; the `cli` feature adds the command-line interface
//! and progress reporting. To use only as a library:
//!
//! ```toml
//! [dependencies]
//! cutout = { version = "0.1", default-features = false, features = ["onnx"] }
//! ```
//!
//! ## Quality semantics
//!
//! The single quality value (1-100) is used directly as JPEG encoder quality.
//! For PNG it maps onto the 0-9 compression-level scale via
//! [`png_compression_level`], which is a compression *effort* knob rather
//! than a visual quality control; see that function for the details of this
//! historical naming mismatch.

pub mod backends;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod inference;
pub mod models;
pub mod processor;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use cache::{human_size, ModelManifest, ModelStore, StoredModel};
pub use config::{ExecutionProvider, RemoverConfig, RemoverConfigBuilder};
pub use download::{resolve_model_file_url, validate_model_url, ModelFetcher};
pub use error::{CutoutError, Result};
pub use export::{
    export_image, flatten_onto_white, png_compression_level, ExportFormat, ExportReceipt,
    ExportRequest, DEFAULT_QUALITY,
};
pub use inference::SegmentationBackend;
pub use models::{ModelInfo, ModelManager, ModelSource, ModelSpec, PreprocessingProfile};
pub use processor::BackgroundRemover;
pub use services::ImageLoader;
pub use session::EditSession;
pub use types::{CutoutResult, ForegroundMask, RemovalTimings};
pub use utils::{LetterboxGeometry, TensorPreprocessor};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Remove the background from a pre-decoded image
///
/// The most direct API for in-memory processing: no file I/O, no session
/// state. Each call builds a fresh pipeline; hold a [`BackgroundRemover`]
/// yourself to amortize model loading over many images.
pub fn remove_background_from_image(
    image: image::DynamicImage,
    config: &RemoverConfig,
) -> Result<CutoutResult> {
    let mut remover = BackgroundRemover::new(config.clone())?;
    remover.process(&image)
}

/// Remove the background from encoded image bytes
///
/// Suitable for servers and other memory-based processing where no file
/// exists. Accepts any format the imaging library can decode.
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemoverConfig,
) -> Result<CutoutResult> {
    let image = ImageLoader::load_from_bytes(image_bytes)?;
    remove_background_from_image(image, config)
}

/// Remove the background from an async reader stream
///
/// Reads the stream to the end, decodes, and processes. Useful for network
/// streams or large files opened with tokio.
pub async fn remove_background_from_reader<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    config: &RemoverConfig,
) -> Result<CutoutResult> {
    let image = ImageLoader::load_from_reader(reader).await?;
    remove_background_from_image(image, config)
}
