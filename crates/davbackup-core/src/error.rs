use std::fmt;

use thiserror::Error;

/// Substrings (lowercased) that identify a failure which never reached the HTTP layer.
const NETWORK_FAILURE_SIGNATURES: &[&str] = &[
    // name resolution
    "enotfound",
    "eai_again",
    "getaddrinfo",
    "dns error",
    "failed to lookup address",
    "name or service not known",
    // refused
    "econnrefused",
    "connection refused",
    // timeout
    "etimedout",
    "timed out",
    "timeout",
    // unreachable
    "ehostunreach",
    "host unreachable",
    "no route to host",
    "enetunreach",
    "network is unreachable",
];

/// Returns true when `message` carries one of the known network-failure signatures.
pub fn is_network_failure(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    NETWORK_FAILURE_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

/// The remote file operation that was being attempted when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOperation {
    Read,
    Write,
    Delete,
    Stat,
    CreateDirectory,
    ListDirectory,
}

impl FileOperation {
    /// Operations that by definition act on a collection rather than a file.
    pub fn targets_directory(self) -> bool {
        matches!(self, FileOperation::CreateDirectory | FileOperation::ListDirectory)
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::Read => write!(f, "read"),
            FileOperation::Write => write!(f, "write"),
            FileOperation::Delete => write!(f, "delete"),
            FileOperation::Stat => write!(f, "stat"),
            FileOperation::CreateDirectory => write!(f, "create directory"),
            FileOperation::ListDirectory => write!(f, "list directory"),
        }
    }
}

/// What was being attempted, and against which path, when a remote call failed.
///
/// `directory` decides whether an HTTP 404 becomes [`DavError::DirectoryNotFound`]
/// or [`DavError::FileNotFound`]. It is set for directory operations, for paths
/// ending in `/`, and explicitly via [`FailureContext::directory`] when the caller
/// knows it is probing a collection (e.g. the parent of an upload target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    pub operation: FileOperation,
    pub path: String,
    pub directory: bool,
}

impl FailureContext {
    pub fn new(operation: FileOperation, path: impl Into<String>) -> Self {
        let path = path.into();
        let directory = operation.targets_directory() || path.ends_with('/');
        Self {
            operation,
            path,
            directory,
        }
    }

    /// Mark the target as a known directory.
    pub fn directory(mut self) -> Self {
        self.directory = true;
        self
    }
}

/// Closed taxonomy of remote-store failures.
///
/// Every error leaving the transport layer is one of these. Upload and download
/// errors are `FileOperation` with `Write`/`Read` as the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DavError {
    #[error("Could not connect to the WebDAV server: {message}")]
    Connection { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Access forbidden: {path}")]
    Forbidden { path: String, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String, message: String },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String, message: String },

    #[error("Invalid path '{path}': {message}")]
    InvalidPath {
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Conflict while trying to {operation} '{path}': {message}")]
    Conflict {
        operation: FileOperation,
        path: String,
        message: String,
    },

    #[error("Insufficient storage on server for '{path}': {message}")]
    InsufficientStorage { path: String, message: String },

    #[error("Rate limited by server: {message}")]
    RateLimited { message: String },

    #[error("Failed to {operation} '{path}': {message}")]
    FileOperation {
        operation: FileOperation,
        path: String,
        status: Option<u16>,
        message: String,
    },
}

impl DavError {
    /// Map a raw failure onto the taxonomy.
    ///
    /// Network signatures in the message win over the status code, since some
    /// failures never produce an HTTP response at all. Without a matching status
    /// the operation-specific file-operation error is used.
    pub fn classify(status: Option<u16>, message: &str, context: &FailureContext) -> Self {
        let message = message.to_string();
        if is_network_failure(&message) {
            return DavError::Connection { message };
        }

        let path = context.path.clone();
        match status {
            Some(status @ (401 | 407)) => DavError::Authentication { status, message },
            Some(403) => DavError::Forbidden { path, message },
            Some(404) if context.directory => DavError::DirectoryNotFound { path, message },
            Some(404) => DavError::FileNotFound { path, message },
            Some(400) => DavError::InvalidPath {
                path,
                status: Some(400),
                message,
            },
            Some(409) => DavError::Conflict {
                operation: context.operation,
                path,
                message,
            },
            Some(507) => DavError::InsufficientStorage { path, message },
            Some(429) => DavError::RateLimited { message },
            status => DavError::FileOperation {
                operation: context.operation,
                path,
                status,
                message,
            },
        }
    }

    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        DavError::InvalidPath {
            path: path.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn file_operation(
        operation: FileOperation,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DavError::FileOperation {
            operation,
            path: path.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn upload(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::file_operation(FileOperation::Write, path, message)
    }

    pub fn download(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::file_operation(FileOperation::Read, path, message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DavError::FileNotFound { .. } | DavError::DirectoryNotFound { .. }
        )
    }

    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            DavError::FileOperation {
                operation: FileOperation::Write,
                ..
            }
        )
    }

    pub fn is_download_error(&self) -> bool {
        matches!(
            self,
            DavError::FileOperation {
                operation: FileOperation::Read,
                ..
            }
        )
    }

    /// HTTP status that produced this error, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            DavError::Authentication { status, .. } => Some(*status),
            DavError::Forbidden { .. } => Some(403),
            DavError::FileNotFound { .. } | DavError::DirectoryNotFound { .. } => Some(404),
            DavError::InvalidPath { status, .. } => *status,
            DavError::Conflict { .. } => Some(409),
            DavError::InsufficientStorage { .. } => Some(507),
            DavError::RateLimited { .. } => Some(429),
            DavError::FileOperation { status, .. } => *status,
            DavError::Connection { .. } | DavError::Network { .. } => None,
        }
    }

    /// Remote path involved in the failure, if the kind records one.
    pub fn path(&self) -> Option<&str> {
        match self {
            DavError::Forbidden { path, .. }
            | DavError::FileNotFound { path, .. }
            | DavError::DirectoryNotFound { path, .. }
            | DavError::InvalidPath { path, .. }
            | DavError::Conflict { path, .. }
            | DavError::InsufficientStorage { path, .. }
            | DavError::FileOperation { path, .. } => Some(path),
            DavError::Connection { .. }
            | DavError::Network { .. }
            | DavError::Authentication { .. }
            | DavError::RateLimited { .. } => None,
        }
    }

    /// Short remediation hint suitable for a status line or CLI message.
    pub fn hint(&self) -> &'static str {
        match self {
            DavError::Connection { .. } => {
                "Check the server URL and that the server is reachable from this machine."
            }
            DavError::Network { .. } => "A network error interrupted the request. Try again.",
            DavError::Authentication { .. } => "Check the username and password.",
            DavError::Forbidden { .. } => {
                "The account does not have permission to access this location."
            }
            DavError::FileNotFound { .. } => {
                "No backup exists at the configured remote path yet."
            }
            DavError::DirectoryNotFound { .. } => {
                "A folder in the remote path does not exist on the server."
            }
            DavError::InvalidPath { .. } => {
                "The remote path is not valid. Do not start or end it with '/'."
            }
            DavError::Conflict { .. } => {
                "The server reported a conflict. A parent folder may be missing or a file is in the way."
            }
            DavError::InsufficientStorage { .. } => "The server is out of storage space.",
            DavError::RateLimited { .. } => "The server is rate limiting requests. Wait and retry.",
            DavError::FileOperation { .. } => "The server rejected the file operation.",
        }
    }
}

/// Which bulk data-provider operation a storage failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPhase {
    Exporting,
    Clearing,
    Importing,
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderPhase::Exporting => write!(f, "exporting data"),
            ProviderPhase::Clearing => write!(f, "clearing local data"),
            ProviderPhase::Importing => write!(f, "importing data"),
        }
    }
}

/// Why a restore failed after settings validation.
#[derive(Error, Debug)]
pub enum RestoreCause {
    #[error(transparent)]
    Transport(#[from] DavError),

    #[error("backup data is corrupted or not valid JSON: {0}")]
    Corrupted(#[source] serde_json::Error),
}

/// Errors surfaced by the backup/restore orchestrator.
///
/// Lower-level failures are always kept as `source` so callers can drill down to
/// the taxonomy kind with [`BackupError::dav_error`].
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration missing: {field} is not set")]
    ConfigurationMissing { field: &'static str },

    #[error("Storage provider '{provider}' failed while {phase}: {source}")]
    StorageProvider {
        provider: String,
        phase: ProviderPhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to serialize backup data: {source}")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Backup failed: {message}")]
    Backup {
        message: String,
        #[source]
        source: DavError,
    },

    /// Store setup failed outside a backup or restore (connection checks, listings).
    #[error("Remote store unavailable: {message}")]
    Remote {
        message: String,
        #[source]
        source: DavError,
    },

    #[error("Restore failed: {message}")]
    Restore {
        message: String,
        #[source]
        source: RestoreCause,
    },
}

impl BackupError {
    pub fn provider(provider: &str, phase: ProviderPhase, source: anyhow::Error) -> Self {
        BackupError::StorageProvider {
            provider: provider.to_string(),
            phase,
            source,
        }
    }

    /// Wrap a transport failure in the backup domain, keeping its message.
    pub fn backup(source: DavError) -> Self {
        BackupError::Backup {
            message: source.to_string(),
            source,
        }
    }

    /// Wrap a store setup failure that belongs to neither domain.
    pub fn remote(source: DavError) -> Self {
        BackupError::Remote {
            message: source.to_string(),
            source,
        }
    }

    /// Wrap a transport failure in the restore domain, keeping its message.
    pub fn restore(source: DavError) -> Self {
        BackupError::Restore {
            message: source.to_string(),
            source: RestoreCause::Transport(source),
        }
    }

    pub fn corrupted(path: &str, source: serde_json::Error) -> Self {
        BackupError::Restore {
            message: format!(
                "backup file '{}' appears to be corrupted (invalid JSON): {}",
                path, source
            ),
            source: RestoreCause::Corrupted(source),
        }
    }

    /// The nested taxonomy error, if this failure came from the transport.
    pub fn dav_error(&self) -> Option<&DavError> {
        match self {
            BackupError::Backup { source, .. } | BackupError::Remote { source, .. } => {
                Some(source)
            }
            BackupError::Restore {
                source: RestoreCause::Transport(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// The provider phase, for storage-provider failures.
    pub fn phase(&self) -> Option<ProviderPhase> {
        match self {
            BackupError::StorageProvider { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn file_ctx(operation: FileOperation) -> FailureContext {
        FailureContext::new(operation, "notes/backup.json")
    }

    fn kind(err: &DavError) -> &'static str {
        match err {
            DavError::Connection { .. } => "connection",
            DavError::Network { .. } => "network",
            DavError::Authentication { .. } => "authentication",
            DavError::Forbidden { .. } => "forbidden",
            DavError::FileNotFound { .. } => "file-not-found",
            DavError::DirectoryNotFound { .. } => "directory-not-found",
            DavError::InvalidPath { .. } => "invalid-path",
            DavError::Conflict { .. } => "conflict",
            DavError::InsufficientStorage { .. } => "insufficient-storage",
            DavError::RateLimited { .. } => "rate-limited",
            DavError::FileOperation { .. } => "file-operation",
        }
    }

    #[test]
    fn test_status_table() {
        let ctx = file_ctx(FileOperation::Write);
        let cases = [
            (401, "authentication"),
            (407, "authentication"),
            (403, "forbidden"),
            (404, "file-not-found"),
            (400, "invalid-path"),
            (409, "conflict"),
            (507, "insufficient-storage"),
            (429, "rate-limited"),
            (500, "file-operation"),
            (502, "file-operation"),
        ];

        for (status, expected) in cases {
            let err = DavError::classify(Some(status), "server said no", &ctx);
            assert_eq!(kind(&err), expected, "status {}", status);
        }

        let auth = DavError::classify(Some(407), "proxy", &ctx);
        assert_eq!(auth.status(), Some(407));

        let bad_request = DavError::classify(Some(400), "Bad Request", &ctx);
        assert_eq!(bad_request.status(), Some(400));
        assert_eq!(DavError::invalid_path("a/", "trailing slash").status(), None);

        let conflict = DavError::classify(Some(409), "parent missing", &ctx);
        assert!(matches!(
            conflict,
            DavError::Conflict {
                operation: FileOperation::Write,
                ..
            }
        ));

        let generic = DavError::classify(Some(500), "boom", &ctx);
        assert!(generic.is_upload_error());
        assert_eq!(generic.status(), Some(500));
    }

    #[test]
    fn test_not_found_file_vs_directory() {
        let file = DavError::classify(Some(404), "Not Found", &file_ctx(FileOperation::Read));
        assert!(matches!(file, DavError::FileNotFound { .. }));

        let mkcol = DavError::classify(
            Some(404),
            "Not Found",
            &FailureContext::new(FileOperation::CreateDirectory, "a/b"),
        );
        assert!(matches!(mkcol, DavError::DirectoryNotFound { .. }));

        let list = DavError::classify(
            Some(404),
            "Not Found",
            &FailureContext::new(FileOperation::ListDirectory, "a"),
        );
        assert!(matches!(list, DavError::DirectoryNotFound { .. }));

        let trailing = DavError::classify(
            Some(404),
            "Not Found",
            &FailureContext::new(FileOperation::Stat, "a/b/"),
        );
        assert!(matches!(trailing, DavError::DirectoryNotFound { .. }));

        let known_dir = DavError::classify(
            Some(404),
            "Not Found",
            &FailureContext::new(FileOperation::Stat, "a/b").directory(),
        );
        assert!(matches!(known_dir, DavError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_network_message_beats_status() {
        let ctx = file_ctx(FileOperation::Read);
        for message in [
            "getaddrinfo ENOTFOUND dav.example.com",
            "connect ECONNREFUSED 127.0.0.1:443",
            "tcp connect error: Connection refused (os error 111)",
            "operation timed out",
            "No route to host",
        ] {
            let err = DavError::classify(Some(401), message, &ctx);
            assert!(
                matches!(err, DavError::Connection { .. }),
                "{} produced {:?}",
                message,
                err
            );
        }
    }

    #[test]
    fn test_default_without_status_is_operation_specific() {
        let upload = DavError::classify(None, "body stream broke", &file_ctx(FileOperation::Write));
        assert!(upload.is_upload_error());
        assert_eq!(upload.status(), None);

        let download = DavError::classify(None, "invalid utf-8", &file_ctx(FileOperation::Read));
        assert!(download.is_download_error());
        assert!(!download.is_upload_error());
    }

    #[test]
    fn test_is_not_found() {
        let ctx = file_ctx(FileOperation::Stat);
        assert!(DavError::classify(Some(404), "", &ctx).is_not_found());
        assert!(DavError::classify(Some(404), "", &ctx.clone().directory()).is_not_found());
        assert!(!DavError::classify(Some(403), "", &ctx).is_not_found());
        assert!(!DavError::classify(Some(500), "", &ctx).is_not_found());
    }

    #[test]
    fn test_backup_wrapping_preserves_message_and_source() {
        let dav = DavError::classify(
            Some(507),
            "quota exceeded",
            &file_ctx(FileOperation::Write),
        );
        let err = BackupError::backup(dav.clone());
        assert!(err.to_string().contains(&dav.to_string()));
        assert_eq!(err.dav_error(), Some(&dav));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_corrupted_restore_mentions_corruption() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = BackupError::corrupted("backup.json", parse_err);
        assert!(err.to_string().contains("corrupted"));
        assert!(err.dav_error().is_none());
        assert!(matches!(
            err,
            BackupError::Restore {
                source: RestoreCause::Corrupted(_),
                ..
            }
        ));
    }

    #[test]
    fn test_provider_error_names_phase() {
        let err = BackupError::provider(
            "json-file",
            ProviderPhase::Clearing,
            anyhow::anyhow!("disk is read-only"),
        );
        assert_eq!(err.phase(), Some(ProviderPhase::Clearing));
        let text = err.to_string();
        assert!(text.contains("json-file"));
        assert!(text.contains("clearing"));
        assert!(text.contains("disk is read-only"));
    }
}
