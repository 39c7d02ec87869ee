//! Bundle persistence
//!
//! `FsStore` layout, one directory per run:
//!
//! ```text
//! <root>/<run_id>/
//!   bundle.json          full bundle, documents included
//!   index.html           entry document and the other bootstrap files
//!   App.jsx
//!   components/*.jsx
//!   pages/*.jsx
//!   requirements.md
//! ```
//!
//! A run is written into a staging directory and renamed into place, so a
//! reader never sees a partial run.

use appforge_sdk::{async_trait, RunId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::Bundle;

const BUNDLE_FILE: &str = "bundle.json";
const REQUIREMENTS_FILE: &str = "requirements.md";

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save(&self, run_id: RunId, bundle: &Bundle) -> Result<(), StoreError>;

    async fn load(&self, run_id: RunId) -> Result<Bundle, StoreError>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    runs: Mutex<HashMap<RunId, Bundle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run_ids(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self.runs.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save(&self, run_id: RunId, bundle: &Bundle) -> Result<(), StoreError> {
        self.runs.lock().await.insert(run_id, bundle.clone());
        Ok(())
    }

    async fn load(&self, run_id: RunId) -> Result<Bundle, StoreError> {
        self.runs
            .lock()
            .await
            .get(&run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(run_id.to_string()))
    }
}

/// Directory-per-run store on the local filesystem
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: RunId) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    async fn write_files(dir: &Path, bundle: &Bundle) -> Result<(), StoreError> {
        for artifact in &bundle.artifacts {
            let path = safe_join(dir, &artifact.filename)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, &artifact.content).await?;
        }

        if let Some(documents) = &bundle.documents {
            fs::write(dir.join(REQUIREMENTS_FILE), &documents.requirements).await?;
        }

        let json = serde_json::to_vec_pretty(bundle)?;
        fs::write(dir.join(BUNDLE_FILE), json).await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for FsStore {
    async fn save(&self, run_id: RunId, bundle: &Bundle) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;

        let staging = self.root.join(format!(".staging-{}", run_id));
        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        if let Err(e) = Self::write_files(&staging, bundle).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        let target = self.run_dir(run_id);
        if fs::try_exists(&target).await? {
            debug!(run_id = %run_id, "replacing existing run");
            fs::remove_dir_all(&target).await?;
        }
        fs::rename(&staging, &target).await?;

        info!(
            run_id = %run_id,
            path = %target.display(),
            files = bundle.artifacts.len(),
            "run saved"
        );
        Ok(())
    }

    async fn load(&self, run_id: RunId) -> Result<Bundle, StoreError> {
        let path = self.run_dir(run_id).join(BUNDLE_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(run_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Join a bundle-relative filename, rejecting absolute paths and `..`
fn safe_join(dir: &Path, filename: &str) -> Result<PathBuf, StoreError> {
    let relative = Path::new(filename);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if escapes || filename.is_empty() {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("artifact filename escapes the run directory: {}", filename),
        )));
    }
    Ok(dir.join(relative))
}
