//! File-backed storage for scoreboard documents
//!
//! One pretty-printed JSON file per mode, created from the template on first
//! access and rewritten in full on every change. There is no cache: each
//! call reads from disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use crate::models::{Document, Mode};

pub struct Store {
    data_dir: PathBuf,
    template_path: PathBuf,
    /// Serialises read-modify-write cycles per mode within this process.
    /// Other processes writing the same files are still last-write-wins.
    locks: [Mutex<()>; 2],
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            template_path: template_path.into(),
            locks: [Mutex::new(()), Mutex::new(())],
        }
    }

    pub fn path_for(&self, mode: Mode) -> PathBuf {
        self.data_dir.join(mode.file_name())
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Load a mode's document, copying the template into place if the file is missing.
    /// The top-level error message names only the mode; file paths sit in the chain.
    pub async fn load(&self, mode: Mode) -> Result<Document> {
        self.load_file(mode)
            .await
            .with_context(|| format!("Failed to load {} scoreboard", mode))
    }

    /// Overwrite a mode's file with the full document
    pub async fn save(&self, mode: Mode, doc: &Document) -> Result<()> {
        self.save_file(mode, doc)
            .await
            .with_context(|| format!("Failed to save {} scoreboard", mode))
    }

    async fn load_file(&self, mode: Mode) -> Result<Document> {
        let path = self.path_for(mode);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.init_from_template(mode, &path).await?;
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
    }

    async fn save_file(&self, mode: Mode, doc: &Document) -> Result<()> {
        let path = self.path_for(mode);
        let content = serde_json::to_string_pretty(doc).context("Failed to serialize document")?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {:?}", path))
    }

    /// Load under the mode's lock, so a concurrent update is never seen half-written
    pub async fn read(&self, mode: Mode) -> Result<Document> {
        let _guard = self.locks[mode.index()].lock().await;
        self.load(mode).await
    }

    /// Load, mutate and save as one step with respect to other callers in this process
    pub async fn update<F, R>(&self, mode: Mode, apply: F) -> Result<R>
    where
        F: FnOnce(&mut Document) -> R,
    {
        let _guard = self.locks[mode.index()].lock().await;
        let mut doc = self.load(mode).await?;
        let out = apply(&mut doc);
        self.save(mode, &doc).await?;
        Ok(out)
    }

    async fn init_from_template(&self, mode: Mode, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {:?}", self.data_dir))?;
        tokio::fs::copy(&self.template_path, path)
            .await
            .with_context(|| {
                format!("Failed to copy template {:?} to {:?}", self.template_path, path)
            })?;
        tracing::info!("Initialized {} scoreboard at {:?} from template", mode, path);
        Ok(())
    }
}
