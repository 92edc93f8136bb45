use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DavError;
use crate::settings::ConnectionSettings;

/// Type of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    File,
    Directory,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Path relative to the server base URL
    pub path: String,
    pub kind: ResourceKind,
    /// Content length in bytes (files only, when the server reports it)
    pub size: Option<u64>,
}

/// Path-aware remote file store with classified failures.
///
/// Every error returned is a [`DavError`]; implementations never leak
/// transport-library errors. Paths are relative to the configured server URL
/// and use `/` as separator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write `data` to `path`, overwriting, creating missing parent directories.
    async fn upload(&self, path: &str, data: &[u8]) -> Result<(), DavError>;

    /// Read the file at `path` as text.
    async fn download(&self, path: &str) -> Result<String, DavError>;

    /// Whether `path` exists.
    ///
    /// Returns `Ok(false)` only for a not-found classification; every other
    /// failure is returned so callers can tell "missing" from "unknown".
    async fn path_exists(&self, path: &str) -> Result<bool, DavError>;

    /// Create `path` and every missing ancestor.
    async fn create_directory_recursive(&self, path: &str) -> Result<(), DavError>;

    /// Delete the file at `path`.
    async fn delete_file(&self, path: &str) -> Result<(), DavError>;

    /// List the direct children of the directory at `path` (empty for the root).
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, DavError>;

    /// Verify the server is reachable and the credentials are accepted.
    async fn check_connection(&self) -> Result<(), DavError>;
}

/// Builds a [`RemoteStore`] for a set of connection settings.
///
/// The orchestrator receives one of these instead of constructing a client
/// itself, so tests can hand it a fake.
pub trait RemoteStoreFactory: Send + Sync {
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>, DavError>;
}

impl<F> RemoteStoreFactory for F
where
    F: Fn(&ConnectionSettings) -> Result<Box<dyn RemoteStore>, DavError> + Send + Sync,
{
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>, DavError> {
        self(settings)
    }
}
