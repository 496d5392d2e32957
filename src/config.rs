//! Configuration types for background removal

use crate::error::{CutoutError, Result};
use crate::models::ModelSpec;
use serde::{Deserialize, Serialize};

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = CutoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(CutoutError::invalid_config(format!(
                "Unknown execution provider '{other}' (expected auto, cpu, cuda, or coreml)"
            ))),
        }
    }
}

/// Configuration for the background removal pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoverConfig {
    /// Model specification (explicit path or cached model id)
    pub model_spec: ModelSpec,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,

    /// Enable debug mode (additional logging and validation)
    pub debug: bool,
}

impl Default for RemoverConfig {
    fn default() -> Self {
        Self {
            model_spec: ModelSpec::default(),
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
            inter_threads: 0,
            debug: false,
        }
    }
}

impl RemoverConfig {
    /// Create a new configuration builder for fluent construction
    #[must_use]
    pub fn builder() -> RemoverConfigBuilder {
        RemoverConfigBuilder::default()
    }
}

/// Builder for [`RemoverConfig`]
#[derive(Debug, Default)]
pub struct RemoverConfigBuilder {
    config: RemoverConfig,
}

impl RemoverConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model_spec(mut self, model_spec: ModelSpec) -> Self {
        self.config.model_spec = model_spec;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RemoverConfig> {
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSource;

    #[test]
    fn test_execution_provider_round_trip() {
        for provider in [
            ExecutionProvider::Auto,
            ExecutionProvider::Cpu,
            ExecutionProvider::Cuda,
            ExecutionProvider::CoreMl,
        ] {
            let parsed: ExecutionProvider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_execution_provider_rejects_unknown() {
        assert!("tpu".parse::<ExecutionProvider>().is_err());
    }

    #[test]
    fn test_builder_chain() {
        let config = RemoverConfig::builder()
            .model_spec(ModelSpec {
                source: ModelSource::Cached("test-model".to_string()),
            })
            .execution_provider(ExecutionProvider::Cpu)
            .intra_threads(4)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.intra_threads, 4);
        assert!(config.debug);
    }
}
