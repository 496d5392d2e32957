//! Model fetching
//!
//! Async download of segmentation models into the local store, with progress
//! reporting, SHA-256 bookkeeping, and atomic placement (temp directory
//! renamed into the store only once the file is fully written).

use crate::cache::{ModelManifest, ModelStore, MANIFEST_FILE_NAME, MODEL_FILE_NAME};
use crate::error::{CutoutError, Result};
use futures_util::StreamExt;
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    fn for_download(show_progress: bool, total: Option<u64>) -> Self {
        #[cfg(feature = "cli")]
        if show_progress {
            let bar = match total {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            };
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            return Self::Indicatif(bar);
        }
        let _ = (show_progress, total);
        Self::NoOp
    }

    fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(bar) => bar.set_message(msg),
            Self::NoOp => {},
        }
    }

    fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(bar) => bar.set_position(pos),
            Self::NoOp => {},
        }
    }

    fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(bar) => bar.finish_with_message(msg),
            Self::NoOp => {},
        }
    }
}

/// Downloads models into a [`ModelStore`]
#[derive(Debug)]
pub struct ModelFetcher {
    client: Client,
    store: ModelStore,
}

impl ModelFetcher {
    /// Create a fetcher writing to the default store
    ///
    /// # Errors
    /// - Failed to create HTTP client
    /// - Failed to open the model store
    pub fn new() -> Result<Self> {
        Self::with_store(ModelStore::new()?)
    }

    /// Create a fetcher writing to a specific store
    pub fn with_store(store: ModelStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| CutoutError::network("Failed to create HTTP client", e))?;
        Ok(Self { client, store })
    }

    /// The store this fetcher writes to
    #[must_use]
    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Fetch a model by URL, returning its store id
    ///
    /// Already-stored models are not fetched again. The download lands in a
    /// temporary directory inside the store and is renamed into place only
    /// after the file is complete, so an interrupted download never yields a
    /// usable-looking entry.
    pub async fn fetch(&self, url: &str, show_progress: bool) -> Result<String> {
        validate_model_url(url)?;

        let model_id = ModelStore::url_to_model_id(url);
        if self.store.contains(&model_id) {
            log::info!("model already stored: {model_id}");
            return Ok(model_id);
        }

        let file_url = resolve_model_file_url(url);
        log::info!("fetching model {model_id} from {file_url}");

        let response = self
            .client
            .get(&file_url)
            .send()
            .await
            .map_err(|e| CutoutError::network(format!("Failed to request {file_url}"), e))?
            .error_for_status()
            .map_err(|e| CutoutError::network(format!("Server rejected {file_url}"), e))?;

        let total = response.content_length();
        let progress = ProgressIndicator::for_download(show_progress, total);
        progress.set_message(format!("downloading {model_id}"));

        // Stage the download next to its final location so the rename below
        // stays on one filesystem.
        let staging = tempfile::Builder::new()
            .prefix(".fetch-")
            .tempdir_in(self.store.dir())
            .map_err(|e| {
                CutoutError::file_io_error("create staging directory in", self.store.dir(), &e)
            })?;
        let staging_dir: PathBuf = staging.keep();

        let outcome = self
            .stream_to_staging(response, &staging_dir, &progress)
            .await;

        let (size_bytes, sha256) = match outcome {
            Ok(fields) => fields,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging_dir);
                return Err(e);
            },
        };

        let manifest = ModelManifest {
            model_id: model_id.clone(),
            url: url.to_string(),
            sha256,
            size_bytes,
            downloaded_at: chrono::Utc::now(),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| CutoutError::processing(format!("Failed to serialize manifest: {e}")))?;
        if let Err(e) = std::fs::write(staging_dir.join(MANIFEST_FILE_NAME), manifest_json) {
            let _ = std::fs::remove_dir_all(&staging_dir);
            return Err(CutoutError::file_io_error(
                "write model manifest in",
                &staging_dir,
                &e,
            ));
        }

        let entry_dir = self.store.dir().join(&model_id);
        if let Err(e) = std::fs::rename(&staging_dir, &entry_dir) {
            let _ = std::fs::remove_dir_all(&staging_dir);
            return Err(CutoutError::file_io_error(
                "move fetched model into",
                &entry_dir,
                &e,
            ));
        }

        progress.finish_with_message(format!(
            "downloaded {model_id} ({})",
            crate::cache::human_size(size_bytes)
        ));
        log::info!("stored model {model_id} ({size_bytes} bytes)");
        Ok(model_id)
    }

    async fn stream_to_staging(
        &self,
        response: reqwest::Response,
        staging_dir: &std::path::Path,
        progress: &ProgressIndicator,
    ) -> Result<(u64, String)> {
        let model_path = staging_dir.join(MODEL_FILE_NAME);
        let mut file = tokio::fs::File::create(&model_path)
            .await
            .map_err(|e| CutoutError::file_io_error("create model file", &model_path, &e))?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CutoutError::network("Download stream failed", e))?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| CutoutError::file_io_error("write model file", &model_path, &e))?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        file.flush()
            .await
            .map_err(|e| CutoutError::file_io_error("flush model file", &model_path, &e))?;

        if downloaded == 0 {
            return Err(CutoutError::network(
                "Download produced an empty file",
                "0 bytes received",
            ));
        }

        Ok((downloaded, format!("{:x}", hasher.finalize())))
    }

    /// Re-hash a stored model and compare against its manifest
    ///
    /// Returns `Ok(true)` when the hashes match, `Ok(false)` when no manifest
    /// is available to compare against.
    pub fn verify(&self, model_id: &str) -> Result<bool> {
        let Some(manifest) = self.store.read_manifest(model_id) else {
            return Ok(false);
        };

        let model_path = self.store.model_file(model_id);
        let bytes = std::fs::read(&model_path)
            .map_err(|e| CutoutError::file_io_error("read stored model", &model_path, &e))?;

        let actual = format!("{:x}", Sha256::digest(&bytes));
        if actual == manifest.sha256 {
            Ok(true)
        } else {
            Err(CutoutError::model(format!(
                "Integrity check failed for '{model_id}': expected {}, got {actual}",
                manifest.sha256
            )))
        }
    }
}

/// Check that a model URL is something the fetcher can work with
pub fn validate_model_url(url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(CutoutError::invalid_config(format!(
            "Model URL must start with http:// or https://: {url}"
        )));
    }
    Ok(())
}

/// Resolve a repository URL to the concrete model file URL
///
/// Direct `.onnx` links pass through; registry repository URLs resolve to the
/// conventional `onnx/model.onnx` artifact.
#[must_use]
pub fn resolve_model_file_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(".onnx") {
        return trimmed.to_string();
    }
    if trimmed.contains("huggingface.co") {
        return format!("{trimmed}/resolve/main/onnx/model.onnx");
    }
    trimmed.to_string()
}
