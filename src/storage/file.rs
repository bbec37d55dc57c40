//! File-backed client storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tokio::sync::Mutex;

use super::ClientStorage;
use crate::{Error, Result};

const STORAGE_FILE: &str = "client-storage.json";

/// Storage persisted as a flat JSON object on disk.
///
/// The whole document is loaded on open and rewritten after every
/// mutation, so a crash never leaves a half-written key behind.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Default location under the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pong-client").map(|dirs| dirs.data_dir().join(STORAGE_FILE))
    }

    /// Open storage at the default location.
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Storage("no data directory available".into()))?;
        Self::open(path).await
    }

    /// Open storage at `path`, creating an empty document if none exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::Storage(format!(
                        "failed to parse storage file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = data.len(), "Opened client storage");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClientStorage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        data.insert(key.to_string(), value.to_string());
        self.persist(&data).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut data = self.data.lock().await;
        let removed = data.remove(key).is_some();
        if removed {
            self.persist(&data).await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.lock().await;
        data.clear();
        self.persist(&data).await
    }
}
