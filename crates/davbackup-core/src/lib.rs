//! Core types for davbackup: whole-store backup and restore over WebDAV.
//!
//! This crate holds everything that does not depend on an HTTP stack:
//! - `DavError`: the closed taxonomy of remote-store failures and its classifier
//! - `BackupError`: orchestrator errors with phase attribution
//! - `ConnectionSettings`: per-call server URL, credentials and remote path
//! - `DataProvider`: bulk export/import/clear contract of the local store
//! - `RemoteStore` / `RemoteStoreFactory`: the transport the orchestrator drives
//! - `BackupService`: the backup/restore orchestrator

mod backup;
pub mod error;
mod provider;
mod remote;
mod settings;

pub use backup::{BackupService, OperationResult};
pub use error::{
    is_network_failure, BackupError, DavError, FailureContext, FileOperation, ProviderPhase,
    RestoreCause,
};
pub use provider::DataProvider;
pub use remote::{RemoteEntry, RemoteStore, RemoteStoreFactory, ResourceKind};
pub use settings::{ConnectionSettings, DavClientOptions, DEFAULT_BACKUP_FILE};
