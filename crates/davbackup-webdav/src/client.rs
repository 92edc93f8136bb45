use async_trait::async_trait;
use davbackup_core::{is_network_failure, DavError, FailureContext, RemoteEntry};
use thiserror::Error;

/// Raw failure reported by a low-level WebDAV client.
///
/// `Classified` marks an error that was already mapped onto the taxonomy; it
/// passes through [`DavClientError::classify`] untouched so nothing is wrapped
/// twice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DavClientError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("request failed: {message}")]
    Transport { message: String },

    /// Anything else (malformed response, client-side failure).
    #[error("{message}")]
    Other { message: String },

    #[error(transparent)]
    Classified(DavError),
}

impl DavClientError {
    pub fn other(message: impl Into<String>) -> Self {
        DavClientError::Other {
            message: message.into(),
        }
    }

    /// Map onto the taxonomy for the operation described by `context`.
    pub fn classify(self, context: &FailureContext) -> DavError {
        match self {
            DavClientError::Classified(err) => err,
            DavClientError::Status { status, message } => {
                DavError::classify(Some(status), &message, context)
            }
            DavClientError::Transport { message } => {
                if is_network_failure(&message) {
                    DavError::Connection { message }
                } else {
                    DavError::Network { message }
                }
            }
            DavClientError::Other { message } => DavError::classify(None, &message, context),
        }
    }
}

impl From<DavError> for DavClientError {
    fn from(err: DavError) -> Self {
        DavClientError::Classified(err)
    }
}

/// Low-level WebDAV capability wrapped by [`crate::WebDavTransport`].
///
/// Paths are relative to the client's base URL. Implementations report raw
/// failures; classification happens in the transport.
#[async_trait]
pub trait DavClient: Send + Sync {
    /// PROPFIND depth 0.
    async fn stat(&self, path: &str) -> Result<RemoteEntry, DavClientError>;

    /// GET the body as text.
    async fn get_text(&self, path: &str) -> Result<String, DavClientError>;

    /// PUT `data`. With `overwrite == false` an existing file is not replaced.
    async fn put(&self, path: &str, data: &[u8], overwrite: bool) -> Result<(), DavClientError>;

    /// MKCOL a single collection.
    async fn mkcol(&self, path: &str) -> Result<(), DavClientError>;

    async fn delete(&self, path: &str) -> Result<(), DavClientError>;

    /// PROPFIND depth 1, without the entry for `path` itself.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, DavClientError>;
}
