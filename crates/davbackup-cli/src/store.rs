use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use davbackup_core::DataProvider;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

/// Key/value data store persisted as a single JSON object on disk.
///
/// A missing file reads as an empty store. Every mutation rewrites the whole
/// file through a temp file and a rename, so a crash leaves either the old or
/// the new contents.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn entry_count(&self) -> anyhow::Result<usize> {
        Ok(self.load().await?.len())
    }

    async fn load(&self) -> anyhow::Result<BTreeMap<String, Value>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not a JSON object", self.path.display()))
    }

    async fn save(&self, entries: &BTreeMap<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(entries).context("failed to serialize store")?;
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, &data)
            .await
            .with_context(|| format!("failed to write {}", temp_path.display()))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("failed to replace {}", self.path.display()));
        }

        debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl DataProvider for JsonFileStore {
    type Snapshot = BTreeMap<String, Value>;

    fn name(&self) -> &str {
        "json-file"
    }

    async fn export_all(&self) -> anyhow::Result<Self::Snapshot> {
        self.load().await
    }

    async fn import_all(&self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.extend(snapshot);
        self.save(&entries).await
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save(&BTreeMap::new()).await
    }
}
