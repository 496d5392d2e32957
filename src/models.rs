//! Model specification and resolution
//!
//! A model is a single ONNX file, either given as an explicit path or looked
//! up in the local model store by id. Resolution happens eagerly so that a
//! missing model surfaces before any image work starts.

use crate::cache::ModelStore;
use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a model comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    /// Explicit path to an `.onnx` file on disk
    Path(PathBuf),
    /// Model id resolved through the local model store
    Cached(String),
}

impl ModelSource {
    /// Human-readable name for logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Cached(id) => id.clone(),
        }
    }
}

/// Model specification used by the pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Source of the model
    pub source: ModelSource,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            source: ModelSource::Cached(ModelStore::default_model_id()),
        }
    }
}

impl ModelSpec {
    /// Parse a CLI-style model argument
    ///
    /// An existing path wins over everything; otherwise the argument is
    /// treated as a store id. URLs are handled by the fetcher before this
    /// point.
    #[must_use]
    pub fn parse(argument: &str) -> Self {
        let path = Path::new(argument);
        if path.exists() {
            Self {
                source: ModelSource::Path(path.to_path_buf()),
            }
        } else {
            Self {
                source: ModelSource::Cached(argument.to_string()),
            }
        }
    }
}

/// Tensor preparation parameters expected by a segmentation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingProfile {
    /// Square input edge length in pixels
    pub target_size: u32,
    /// Per-channel normalization mean
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization standard deviation
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingProfile {
    fn default() -> Self {
        // ISNet-style models: 1024x1024 input with ImageNet statistics
        Self {
            target_size: 1024,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Basic facts about a resolved model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (file stem or store id)
    pub name: String,
    /// Size of the model file in bytes
    pub size_bytes: u64,
}

/// A resolved, loadable model
#[derive(Debug, Clone)]
pub struct ModelManager {
    name: String,
    onnx_path: PathBuf,
    profile: PreprocessingProfile,
}

impl ModelManager {
    /// Resolve a model spec to a concrete `.onnx` file
    ///
    /// # Errors
    /// - Explicit paths that do not exist or are not `.onnx` files
    /// - Cached ids not present in the model store
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        match &spec.source {
            ModelSource::Path(path) => Self::from_path(path),
            ModelSource::Cached(model_id) => {
                let store = ModelStore::new()?;
                Self::from_store(&store, model_id)
            },
        }
    }

    /// Resolve an explicit model file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CutoutError::model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let is_onnx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));
        if !is_onnx {
            return Err(CutoutError::model(format!(
                "Expected an .onnx model file, got: {}",
                path.display()
            )));
        }

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model")
            .to_string();

        Ok(Self {
            name,
            onnx_path: path.to_path_buf(),
            profile: PreprocessingProfile::default(),
        })
    }

    /// Resolve a model id against a specific store
    pub fn from_store(store: &ModelStore, model_id: &str) -> Result<Self> {
        if !store.contains(model_id) {
            return Err(CutoutError::model(format!(
                "Model '{model_id}' is not in the local store; fetch it first \
                 or pass an explicit .onnx path"
            )));
        }
        Ok(Self {
            name: model_id.to_string(),
            onnx_path: store.model_file(model_id),
            profile: PreprocessingProfile::default(),
        })
    }

    /// Read the model bytes from disk
    pub fn load_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.onnx_path)
            .map_err(|e| CutoutError::file_io_error("read model file", &self.onnx_path, &e))
    }

    /// Basic model facts for logging and diagnostics
    pub fn info(&self) -> Result<ModelInfo> {
        let metadata = std::fs::metadata(&self.onnx_path)
            .map_err(|e| CutoutError::file_io_error("stat model file", &self.onnx_path, &e))?;
        Ok(ModelInfo {
            name: self.name.clone(),
            size_bytes: metadata.len(),
        })
    }

    /// Preprocessing parameters the model expects
    #[must_use]
    pub fn preprocessing_profile(&self) -> &PreprocessingProfile {
        &self.profile
    }

    /// Path of the resolved model file
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.onnx_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_spec_parse_prefers_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("net.onnx");
        std::fs::File::create(&model_path)
            .unwrap()
            .write_all(b"stub")
            .unwrap();

        let spec = ModelSpec::parse(model_path.to_str().unwrap());
        assert!(matches!(spec.source, ModelSource::Path(_)));

        let spec = ModelSpec::parse("some--model-id");
        assert!(matches!(spec.source, ModelSource::Cached(_)));
    }

    #[test]
    fn test_from_path_rejects_missing_and_non_onnx() {
        assert!(ModelManager::from_path("/nonexistent/model.onnx").is_err());

        let dir = tempfile::tempdir().unwrap();
        let wrong = dir.path().join("model.bin");
        std::fs::write(&wrong, b"stub").unwrap();
        assert!(ModelManager::from_path(&wrong).is_err());
    }

    #[test]
    fn test_from_path_resolves_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("isnet-general.onnx");
        std::fs::write(&model_path, b"not a real model").unwrap();

        let manager = ModelManager::from_path(&model_path).unwrap();
        assert_eq!(manager.info().unwrap().name, "isnet-general");
        assert_eq!(manager.load_bytes().unwrap(), b"not a real model");
        assert_eq!(manager.preprocessing_profile().target_size, 1024);
    }
}
