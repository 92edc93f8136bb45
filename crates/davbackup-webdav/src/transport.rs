use async_trait::async_trait;
use davbackup_core::{
    ConnectionSettings, DavClientOptions, DavError, FailureContext, FileOperation, RemoteEntry,
    RemoteStore, RemoteStoreFactory, ResourceKind,
};
use tracing::{debug, instrument, warn};

use crate::client::{DavClient, DavClientError};
use crate::http::HttpDavClient;

/// Path-aware WebDAV store that maps every failure onto [`DavError`].
///
/// Holds nothing but the client handle; all state lives on the server.
pub struct WebDavTransport<C = HttpDavClient> {
    client: C,
}

impl<C> std::fmt::Debug for WebDavTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavTransport").finish_non_exhaustive()
    }
}

impl WebDavTransport<HttpDavClient> {
    /// Build an HTTP-backed transport. A missing or non-http(s) server URL is
    /// rejected with [`DavError::InvalidPath`].
    pub fn from_options(options: DavClientOptions) -> Result<Self, DavError> {
        Ok(Self::new(HttpDavClient::new(options)?))
    }
}

impl<C: DavClient> WebDavTransport<C> {
    /// Wrap an already-constructed client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Make sure the directory that will hold `path` exists.
    ///
    /// Only a not-found stat leads to directory creation. Any other stat failure
    /// is logged and left for the write that follows to report.
    async fn ensure_parent_directory(&self, path: &str) -> Result<(), DavError> {
        let Some(parent) = parent_path(path) else {
            return Ok(());
        };

        let context = FailureContext::new(FileOperation::Stat, parent).directory();
        match self.client.stat(parent).await {
            Ok(entry) if entry.kind == ResourceKind::Directory => Ok(()),
            Ok(_) => Err(DavError::file_operation(
                FileOperation::CreateDirectory,
                parent,
                format!("'{}' exists but is a file, not a directory", parent),
            )),
            Err(err) => {
                let err = err.classify(&context);
                if err.is_not_found() {
                    debug!("Parent directory {} is missing, creating it", parent);
                    self.create_directory_recursive(parent).await
                } else {
                    warn!(
                        "Could not check parent directory {} ({}); continuing with the write",
                        parent, err
                    );
                    Ok(())
                }
            }
        }
    }
}

#[async_trait]
impl<C: DavClient> RemoteStore for WebDavTransport<C> {
    #[instrument(skip(self, data), level = "debug", fields(data_len = data.len()))]
    async fn upload(&self, path: &str, data: &[u8]) -> Result<(), DavError> {
        self.ensure_parent_directory(path).await?;

        self.client
            .put(path, data, true)
            .await
            .map_err(|e| e.classify(&FailureContext::new(FileOperation::Write, path)))?;

        debug!("Uploaded {} bytes to {}", data.len(), path);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn download(&self, path: &str) -> Result<String, DavError> {
        let text = self
            .client
            .get_text(path)
            .await
            .map_err(|e| e.classify(&FailureContext::new(FileOperation::Read, path)))?;

        debug!("Downloaded {} bytes from {}", text.len(), path);
        Ok(text)
    }

    #[instrument(skip(self), level = "debug")]
    async fn path_exists(&self, path: &str) -> Result<bool, DavError> {
        match self.client.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.classify(&FailureContext::new(FileOperation::Stat, path));
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_directory_recursive(&self, path: &str) -> Result<(), DavError> {
        let mut current = String::new();

        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);

            let context = FailureContext::new(FileOperation::CreateDirectory, current.as_str());
            match self.client.stat(&current).await {
                Ok(entry) if entry.kind == ResourceKind::Directory => continue,
                Ok(_) => {
                    return Err(DavError::file_operation(
                        FileOperation::CreateDirectory,
                        current.as_str(),
                        "a file already exists at this path",
                    ));
                }
                Err(err) => {
                    let err = err.classify(&context);
                    if !err.is_not_found() {
                        return Err(err);
                    }
                }
            }

            match self.client.mkcol(&current).await {
                Ok(()) => debug!("Created directory {}", current),
                // 405: created concurrently by someone else
                Err(DavClientError::Status { status: 405, .. }) => {
                    debug!("Directory {} already exists", current)
                }
                Err(err) => return Err(err.classify(&context)),
            }
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_file(&self, path: &str) -> Result<(), DavError> {
        self.client
            .delete(path)
            .await
            .map_err(|e| e.classify(&FailureContext::new(FileOperation::Delete, path)))?;

        debug!("Deleted {}", path);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, DavError> {
        self.client
            .list(path)
            .await
            .map_err(|e| e.classify(&FailureContext::new(FileOperation::ListDirectory, path)))
    }

    #[instrument(skip(self), level = "debug")]
    async fn check_connection(&self) -> Result<(), DavError> {
        self.client
            .stat("")
            .await
            .map_err(|e| e.classify(&FailureContext::new(FileOperation::Stat, "/").directory()))?;
        Ok(())
    }
}

/// Builds HTTP-backed transports from connection settings.
#[derive(Debug, Clone, Default)]
pub struct WebDavStoreFactory {
    timeout_secs: Option<u64>,
}

impl WebDavStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}

impl RemoteStoreFactory for WebDavStoreFactory {
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>, DavError> {
        let mut options = settings.client_options();
        options.timeout_secs = self.timeout_secs;
        Ok(Box::new(WebDavTransport::from_options(options)?))
    }
}

/// Parent directory of `path`, or `None` when it sits at the root.
fn parent_path(path: &str) -> Option<&str> {
    let (parent, _) = path.trim_matches('/').rsplit_once('/')?;
    let parent = parent.trim_end_matches('/');
    (!parent.is_empty()).then_some(parent)
}
