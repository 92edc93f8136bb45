use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::error::{BackupError, ProviderPhase};
use crate::provider::DataProvider;
use crate::remote::{RemoteStore, RemoteStoreFactory};
use crate::settings::ConnectionSettings;

/// Outcome of a successful backup or restore.
///
/// Failures are returned as [`BackupError`], never as `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// Whole-store backup and restore against a remote WebDAV file.
///
/// Stateless apart from the injected store factory; settings and the data
/// provider are supplied per call. Callers must not run two operations against
/// the same provider concurrently: restore's clear+import pair is not isolated.
pub struct BackupService<F> {
    factory: F,
}

impl<F> std::fmt::Debug for BackupService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupService").finish_non_exhaustive()
    }
}

impl<F: RemoteStoreFactory> BackupService<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Export → serialize → upload.
    #[instrument(skip(self, settings, provider), level = "debug", fields(provider = provider.name()))]
    pub async fn backup<P: DataProvider>(
        &self,
        settings: &ConnectionSettings,
        provider: &P,
    ) -> Result<OperationResult, BackupError> {
        require_server_url(settings)?;
        let path = settings.resolve_remote_path().map_err(BackupError::backup)?;
        let store = self.factory.connect(settings).map_err(BackupError::backup)?;

        let snapshot = provider
            .export_all()
            .await
            .map_err(|e| BackupError::provider(provider.name(), ProviderPhase::Exporting, e))?;
        debug!("Exported data from provider {}", provider.name());

        let payload =
            serde_json::to_vec(&snapshot).map_err(|source| BackupError::Serialization { source })?;

        store
            .upload(&path, &payload)
            .await
            .map_err(BackupError::backup)?;

        info!("Backup of {} bytes uploaded to {}", payload.len(), path);
        Ok(OperationResult::success(format!(
            "Backup uploaded to {}",
            path
        )))
    }

    /// Download → parse → clear → import.
    ///
    /// Nothing local is touched until the remote file has been downloaded and
    /// parsed. Once `clear_all` succeeds there is no rollback: if the import
    /// then fails the provider is left empty and a fresh restore is needed.
    #[instrument(skip(self, settings, provider), level = "debug", fields(provider = provider.name()))]
    pub async fn restore<P: DataProvider>(
        &self,
        settings: &ConnectionSettings,
        provider: &P,
    ) -> Result<OperationResult, BackupError> {
        require_server_url(settings)?;
        let path = settings.resolve_remote_path().map_err(BackupError::restore)?;
        let store = self.factory.connect(settings).map_err(BackupError::restore)?;

        let body = store
            .download(&path)
            .await
            .map_err(BackupError::restore)?;
        debug!("Downloaded {} bytes from {}", body.len(), path);

        let snapshot: P::Snapshot =
            serde_json::from_str(&body).map_err(|e| BackupError::corrupted(&path, e))?;

        provider
            .clear_all()
            .await
            .map_err(|e| BackupError::provider(provider.name(), ProviderPhase::Clearing, e))?;
        debug!("Cleared local data in provider {}", provider.name());

        if let Err(e) = provider.import_all(snapshot).await {
            error!(
                "Import into {} failed after local data was cleared; the store is now empty until a restore succeeds: {}",
                provider.name(),
                e
            );
            return Err(BackupError::provider(
                provider.name(),
                ProviderPhase::Importing,
                e,
            ));
        }

        info!("Restored data from {}", path);
        Ok(OperationResult::success(format!(
            "Data restored from {}",
            path
        )))
    }

    /// Build a store for `settings` without running an operation.
    pub fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>, BackupError> {
        require_server_url(settings)?;
        self.factory.connect(settings).map_err(BackupError::remote)
    }
}

fn require_server_url(settings: &ConnectionSettings) -> Result<(), BackupError> {
    match settings.server_url() {
        Some(_) => Ok(()),
        None => Err(BackupError::ConfigurationMissing {
            field: "server URL",
        }),
    }
}
