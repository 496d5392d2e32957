//! Local model store
//!
//! Fetched models live under the user cache directory, one subdirectory per
//! model id with the ONNX file plus a small JSON manifest. The store only
//! manages layout and bookkeeping; downloading is the fetcher's job.

use crate::error::{CutoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the model inside a store entry
pub(crate) const MODEL_FILE_NAME: &str = "model.onnx";

/// File name of the manifest inside a store entry
pub(crate) const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Default model repository fetched when nothing else is configured
const DEFAULT_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";

/// Manifest written next to each stored model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Store id of the model
    pub model_id: String,
    /// URL the model was fetched from
    pub url: String,
    /// SHA-256 of the model file, lowercase hex
    pub sha256: String,
    /// Model file size in bytes
    pub size_bytes: u64,
    /// When the model was fetched
    pub downloaded_at: DateTime<Utc>,
}

/// Summary of one stored model, as reported by [`ModelStore::entries`]
#[derive(Debug, Clone)]
pub struct StoredModel {
    /// Store id of the model
    pub model_id: String,
    /// Model file size in bytes
    pub size_bytes: u64,
    /// When the model was fetched, if the manifest recorded it
    pub downloaded_at: Option<DateTime<Utc>>,
}

/// Filesystem-backed model store
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open the store at the default location
    ///
    /// # Errors
    /// - No user cache directory on this platform
    /// - Store directory cannot be created
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| {
            CutoutError::invalid_config("No user cache directory available on this platform")
        })?;
        Self::with_dir(base.join("cutout").join("models"))
    }

    /// Open the store at a custom location
    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CutoutError::file_io_error("create model store directory", &dir, &e))?;
        Ok(Self { dir })
    }

    /// Store directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive a store id from a model URL
    ///
    /// The last two path segments are joined with `--`, matching the
    /// owner/repository shape of model registry URLs:
    /// `https://huggingface.co/imgly/isnet-general-onnx` becomes
    /// `imgly--isnet-general-onnx`.
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let trimmed = url
            .trim_end_matches('/')
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        let raw = match segments.as_slice() {
            [] => "model",
            [only] => only,
            [.., owner, repo] => return format!("{}--{}", sanitize(owner), sanitize(repo)),
        };
        sanitize(raw)
    }

    /// Id of the default model
    #[must_use]
    pub fn default_model_id() -> String {
        Self::url_to_model_id(DEFAULT_MODEL_URL)
    }

    /// URL of the default model
    #[must_use]
    pub fn default_model_url() -> &'static str {
        DEFAULT_MODEL_URL
    }

    /// Whether a complete entry for the model id exists
    #[must_use]
    pub fn contains(&self, model_id: &str) -> bool {
        self.model_file(model_id).is_file()
    }

    /// Path of the model file for an id (whether or not it exists)
    #[must_use]
    pub fn model_file(&self, model_id: &str) -> PathBuf {
        self.dir.join(model_id).join(MODEL_FILE_NAME)
    }

    /// Path of the manifest for an id
    #[must_use]
    pub fn manifest_file(&self, model_id: &str) -> PathBuf {
        self.dir.join(model_id).join(MANIFEST_FILE_NAME)
    }

    /// Read a stored manifest, if present and parseable
    #[must_use]
    pub fn read_manifest(&self, model_id: &str) -> Option<ModelManifest> {
        let raw = std::fs::read_to_string(self.manifest_file(model_id)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// List all complete entries in the store
    pub fn entries(&self) -> Result<Vec<StoredModel>> {
        let mut models = Vec::new();

        let read_dir = std::fs::read_dir(&self.dir)
            .map_err(|e| CutoutError::file_io_error("read model store directory", &self.dir, &e))?;

        for entry in read_dir {
            let entry = entry.map_err(|e| {
                CutoutError::file_io_error("read model store entry", &self.dir, &e)
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(model_id) = entry.file_name().to_str().map(String::from) else {
                continue;
            };

            let model_file = self.model_file(&model_id);
            let Ok(metadata) = std::fs::metadata(&model_file) else {
                log::debug!("skipping incomplete store entry {model_id}");
                continue;
            };

            models.push(StoredModel {
                model_id: model_id.clone(),
                size_bytes: metadata.len(),
                downloaded_at: self.read_manifest(&model_id).map(|m| m.downloaded_at),
            });
        }

        models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(models)
    }

    /// Remove one model from the store; reports whether it existed
    pub fn remove(&self, model_id: &str) -> Result<bool> {
        let entry_dir = self.dir.join(model_id);
        if !entry_dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&entry_dir)
            .map_err(|e| CutoutError::file_io_error("remove stored model", &entry_dir, &e))?;
        Ok(true)
    }

    /// Remove every model from the store; returns the removed ids
    pub fn clear(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for model in self.entries()? {
            if self.remove(&model.model_id)? {
                removed.push(model.model_id);
            }
        }
        Ok(removed)
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Format a byte count for human consumption
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in_tempdir() -> (tempfile::TempDir, ModelStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::with_dir(dir.path().join("models")).unwrap();
        (dir, store)
    }

    fn install_model(store: &ModelStore, model_id: &str, bytes: &[u8]) {
        let entry_dir = store.dir().join(model_id);
        std::fs::create_dir_all(&entry_dir).unwrap();
        std::fs::write(entry_dir.join(MODEL_FILE_NAME), bytes).unwrap();
    }

    #[test]
    fn test_url_to_model_id() {
        assert_eq!(
            ModelStore::url_to_model_id("https://huggingface.co/imgly/isnet-general-onnx"),
            "imgly--isnet-general-onnx"
        );
        assert_eq!(
            ModelStore::url_to_model_id("https://huggingface.co/imgly/isnet-general-onnx/"),
            "imgly--isnet-general-onnx"
        );
        assert_eq!(ModelStore::url_to_model_id("plain-name"), "plain-name");
    }

    #[test]
    fn test_contains_and_model_file() {
        let (_tmp, store) = store_in_tempdir();
        assert!(!store.contains("imgly--isnet-general-onnx"));

        install_model(&store, "imgly--isnet-general-onnx", b"stub");
        assert!(store.contains("imgly--isnet-general-onnx"));
        assert!(store.model_file("imgly--isnet-general-onnx").is_file());
    }

    #[test]
    fn test_entries_skips_incomplete_directories() {
        let (_tmp, store) = store_in_tempdir();
        install_model(&store, "complete-model", b"stub");
        std::fs::create_dir_all(store.dir().join("half-downloaded")).unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].model_id, "complete-model");
        assert_eq!(entries[0].size_bytes, 4);
    }

    #[test]
    fn test_remove_and_clear() {
        let (_tmp, store) = store_in_tempdir();
        install_model(&store, "model-a", b"a");
        install_model(&store, "model-b", b"b");

        assert!(store.remove("model-a").unwrap());
        assert!(!store.remove("model-a").unwrap());

        let removed = store.clear().unwrap();
        assert_eq!(removed, vec!["model-b".to_string()]);
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
