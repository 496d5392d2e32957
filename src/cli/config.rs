//! Conversion from CLI arguments to pipeline configuration

use crate::cli::main_impl::Cli;
use crate::config::{ExecutionProvider, RemoverConfig};
use crate::models::ModelSpec;
use anyhow::{Context, Result};

/// Builds a [`RemoverConfig`] from parsed CLI arguments
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline configuration from CLI arguments and a resolved model
    pub(crate) fn from_cli(cli: &Cli, model_spec: ModelSpec) -> Result<RemoverConfig> {
        let execution_provider: ExecutionProvider = cli
            .execution_provider
            .parse()
            .context("Invalid execution provider")?;

        let config = RemoverConfig::builder()
            .model_spec(model_spec)
            .execution_provider(execution_provider)
            .intra_threads(cli.threads)
            .inter_threads(cli.threads)
            .debug(cli.verbose >= 2)
            .build()
            .context("Invalid configuration")?;

        Ok(config)
    }

    /// Validate CLI arguments before doing any work
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        cli.execution_provider
            .parse::<ExecutionProvider>()
            .context("Invalid execution provider")?;

        if !(1..=100).contains(&cli.quality) {
            anyhow::bail!("Quality must be between 1 and 100, got {}", cli.quality);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSource;

    fn test_cli() -> Cli {
        Cli {
            input: None,
            output: None,
            quality: 95,
            model: None,
            execution_provider: "auto".to_string(),
            threads: 0,
            verbose: 0,
            show_providers: false,
            only_download: false,
            list_models: false,
            clear_cache: false,
            show_cache_dir: false,
            cache_dir: None,
        }
    }

    fn test_model_spec() -> ModelSpec {
        ModelSpec {
            source: ModelSource::Cached("test-model".to_string()),
        }
    }

    #[test]
    fn test_cli_config_conversion() {
        let mut cli = test_cli();
        cli.threads = 4;
        cli.verbose = 2;

        let config = CliConfigBuilder::from_cli(&cli, test_model_spec()).unwrap();
        assert_eq!(config.execution_provider, ExecutionProvider::Auto);
        assert_eq!(config.intra_threads, 4);
        assert!(config.debug);
    }

    #[test]
    fn test_cli_validation() {
        let mut cli = test_cli();
        assert!(CliConfigBuilder::validate_cli(&cli).is_ok());

        cli.execution_provider = "invalid".to_string();
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());

        cli.execution_provider = "cpu".to_string();
        cli.quality = 0;
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());

        cli.quality = 101;
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());
    }
}
