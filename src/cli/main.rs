//! Background removal CLI
//!
//! Command-line front-end driving the load → remove → export cycle, plus
//! model store maintenance (fetch, list, clear).

use super::config::CliConfigBuilder;
use crate::{
    cache::{human_size, ModelStore},
    download::ModelFetcher,
    export::ExportRequest,
    models::{ModelSource, ModelSpec},
    processor::BackgroundRemover,
    services::ImageLoader,
    session::EditSession,
    tracing_config::TracingConfig,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Background removal tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "cutout")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image (.png, .jpg, or .jpeg)
    #[arg(
        value_name = "INPUT",
        required_unless_present_any = &["show_providers", "only_download", "list_models", "clear_cache", "show_cache_dir"]
    )]
    pub input: Option<PathBuf>,

    /// Output file; format follows its extension (.png, .jpg, .jpeg)
    /// [default: <INPUT stem>-cutout.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Quality 1-100 (JPEG quality directly; PNG compression level derived
    /// from the same scale)
    #[arg(short, long, default_value_t = 95)]
    pub quality: u8,

    /// Model id, URL, or path to an .onnx file
    /// [default: fetch the bundled default model on first use]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Execution provider (auto, cpu, cuda, coreml)
    #[arg(short, long, default_value = "auto")]
    pub execution_provider: String,

    /// Number of inference threads (0 = auto-detect)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,

    /// Fetch the model but do not process any image
    #[arg(long)]
    pub only_download: bool,

    /// List stored models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Remove stored models (combine with --model to remove a single one)
    #[arg(long)]
    pub clear_cache: bool,

    /// Show the model store directory and exit
    #[arg(long)]
    pub show_cache_dir: bool,

    /// Use a custom model store directory
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

/// CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()?;

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    CliConfigBuilder::validate_cli(&cli)?;

    let store = match &cli.cache_dir {
        Some(dir) => ModelStore::with_dir(dir.clone())?,
        None => ModelStore::new()?,
    };

    if cli.show_cache_dir {
        println!("{}", store.dir().display());
        return Ok(());
    }

    if cli.list_models {
        return list_models(&store);
    }

    if cli.clear_cache {
        return clear_models(&store, cli.model.as_deref());
    }

    if cli.show_providers {
        return show_providers();
    }

    let model_spec = resolve_model_spec(&cli, &store).await?;

    if cli.only_download {
        println!("Model ready: {}", model_spec.source.display_name());
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("No input image given")?;
    if !ImageLoader::is_supported_input(input) {
        anyhow::bail!(
            "Unsupported input '{}': expected a .png, .jpg, or .jpeg file",
            input.display()
        );
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));

    // Validates quality and destination shape before any heavy work
    let request = ExportRequest::new(&output, cli.quality)?;
    if !request.format()?.supports_transparency() {
        log::info!("JPEG output flattens transparency onto a white background");
    }

    let config = CliConfigBuilder::from_cli(&cli, model_spec)?;
    let mut remover =
        BackgroundRemover::new(config).context("Failed to set up the background remover")?;

    let mut session = EditSession::new();
    session
        .load_path(input)
        .with_context(|| format!("Failed to load '{}'", input.display()))?;
    session
        .remove_background(&mut remover)
        .context("Background removal failed")?;
    let receipt = session.export(&request)?;

    println!(
        "Saved {} ({}) to {}",
        receipt.format,
        human_size(receipt.bytes_written),
        receipt.path.display()
    );
    Ok(())
}

/// Derive the default output path next to the input
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}-cutout.png"))
}

/// Resolve the model argument to a concrete model file, fetching if needed
async fn resolve_model_spec(cli: &Cli, store: &ModelStore) -> Result<ModelSpec> {
    let source = match &cli.model {
        Some(arg) if arg.starts_with("http://") || arg.starts_with("https://") => {
            let fetcher = ModelFetcher::with_store(store.clone())?;
            let model_id = fetcher.fetch(arg, true).await?;
            ModelSource::Path(store.model_file(&model_id))
        },
        Some(arg) => match ModelSpec::parse(arg).source {
            ModelSource::Path(path) => ModelSource::Path(path),
            ModelSource::Cached(id) if store.contains(&id) => {
                ModelSource::Path(store.model_file(&id))
            },
            ModelSource::Cached(id) => anyhow::bail!(
                "Model '{id}' is neither a file nor a stored model; \
                 pass a URL to fetch it first"
            ),
        },
        None => {
            let model_id = ModelStore::default_model_id();
            if !store.contains(&model_id) {
                println!("Fetching default model ({model_id})...");
                let fetcher = ModelFetcher::with_store(store.clone())?;
                fetcher.fetch(ModelStore::default_model_url(), true).await?;
            }
            ModelSource::Path(store.model_file(&model_id))
        },
    };

    Ok(ModelSpec { source })
}

fn list_models(store: &ModelStore) -> Result<()> {
    let entries = store.entries()?;
    if entries.is_empty() {
        println!("No models stored. Fetch one with: cutout --only-download");
        return Ok(());
    }

    println!("Stored models in {}:", store.dir().display());
    for model in entries {
        let when = model
            .downloaded_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  {} ({}, fetched {})",
            model.model_id,
            human_size(model.size_bytes),
            when
        );
    }
    Ok(())
}

fn clear_models(store: &ModelStore, model_id: Option<&str>) -> Result<()> {
    match model_id {
        Some(id) => {
            if store.remove(id)? {
                println!("Removed {id}");
            } else {
                println!("No stored model named {id}");
            }
        },
        None => {
            let removed = store.clear()?;
            println!("Removed {} model(s)", removed.len());
        },
    }
    Ok(())
}

fn show_providers() -> Result<()> {
    #[cfg(feature = "onnx")]
    {
        println!("Execution providers:");
        for (name, available, description) in crate::backends::OnnxBackend::list_providers() {
            let status = if available { "available" } else { "unavailable" };
            println!("  {name}: {status} - {description}");
        }
        Ok(())
    }
    #[cfg(not(feature = "onnx"))]
    {
        anyhow::bail!("ONNX backend not compiled in; rebuild with --features onnx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/photos/dog.jpg")),
            PathBuf::from("/photos/dog-cutout.png")
        );
        assert_eq!(
            default_output_path(Path::new("cat.png")),
            PathBuf::from("cat-cutout.png")
        );
    }

    #[tokio::test]
    async fn test_resolve_model_spec_rejects_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::with_dir(dir.path()).unwrap();

        let cli = Cli::parse_from(["cutout", "--model", "no-such-model", "input.png"]);
        let result = resolve_model_spec(&cli, &store).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_minimal_invocation() {
        let cli = Cli::parse_from(["cutout", "photo.jpg"]);
        assert_eq!(cli.input.as_deref(), Some(Path::new("photo.jpg")));
        assert_eq!(cli.quality, 95);
        assert_eq!(cli.execution_provider, "auto");
    }

    #[test]
    fn test_cli_maintenance_flags_do_not_require_input() {
        assert!(Cli::try_parse_from(["cutout", "--list-models"]).is_ok());
        assert!(Cli::try_parse_from(["cutout", "--show-cache-dir"]).is_ok());
        assert!(Cli::try_parse_from(["cutout"]).is_err());
    }
}
