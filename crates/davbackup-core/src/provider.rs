use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Local data store abstraction consumed by the backup orchestrator.
///
/// Only the bulk contract matters here: export everything as one snapshot,
/// wipe everything, import a snapshot into an empty store. The snapshot's
/// structure is opaque to the orchestrator; it only has to survive a JSON
/// round trip.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Serializable image of the whole store.
    type Snapshot: Serialize + DeserializeOwned + Send + Sync;

    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Export the full data set.
    async fn export_all(&self) -> anyhow::Result<Self::Snapshot>;

    /// Import a snapshot. Callers guarantee the store was cleared first.
    async fn import_all(&self, snapshot: Self::Snapshot) -> anyhow::Result<()>;

    /// Remove all local data.
    async fn clear_all(&self) -> anyhow::Result<()>;
}
