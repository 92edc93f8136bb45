use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DavError;

/// File name used at the server root when no remote path is configured.
pub const DEFAULT_BACKUP_FILE: &str = "backup.json";

/// Connection settings for one backup or restore call.
///
/// Owned by the caller (the settings UI persists it); nothing here is cached.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    /// Absolute server base URL (http or https)
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Remote file path relative to the server URL, without leading or trailing `/`
    #[serde(default)]
    pub remote_path: Option<String>,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_path", &self.remote_path)
            .finish()
    }
}

impl ConnectionSettings {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: Some(server_url.into()),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_remote_path(mut self, remote_path: impl Into<String>) -> Self {
        self.remote_path = Some(remote_path.into());
        self
    }

    /// The server URL, treating blank values as absent.
    pub fn server_url(&self) -> Option<&str> {
        non_blank(self.server_url.as_deref())
    }

    /// Resolve the remote file to read or write.
    ///
    /// Falls back to [`DEFAULT_BACKUP_FILE`] at the server root. A configured path
    /// is used verbatim, but must not begin or end with `/`.
    pub fn resolve_remote_path(&self) -> Result<String, DavError> {
        let Some(path) = self
            .remote_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
        else {
            return Ok(DEFAULT_BACKUP_FILE.to_string());
        };

        if path.starts_with('/') || path.ends_with('/') {
            return Err(DavError::invalid_path(
                path,
                "remote path must not begin or end with '/'",
            ));
        }

        Ok(path.to_string())
    }

    /// Options for building a low-level WebDAV client from these settings.
    pub fn client_options(&self) -> DavClientOptions {
        DavClientOptions {
            server_url: self.server_url().unwrap_or_default().to_string(),
            username: non_blank(self.username.as_deref()).map(str::to_string),
            password: self.password.clone(),
            timeout_secs: None,
        }
    }
}

/// Construction options for a low-level WebDAV client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DavClientOptions {
    pub server_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout; the client applies its own default when unset
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for DavClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DavClientOptions")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
