use std::path::PathBuf;

use clap::{Parser, Subcommand};
use davbackup_core::ConnectionSettings;
use davbackup_webdav::DEFAULT_TIMEOUT_SECS;

/// Configuration for the davbackup command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "davbackup")]
#[command(about = "Back up and restore a local JSON data store to a WebDAV server")]
pub struct Config {
    /// WebDAV server base URL (http or https)
    #[arg(long, env = "DAVBACKUP_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    #[arg(long, env = "DAVBACKUP_USERNAME", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "DAVBACKUP_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Remote backup file, relative to the server URL (default: backup.json)
    #[arg(long, env = "DAVBACKUP_REMOTE_PATH", global = true)]
    pub remote_path: Option<String>,

    /// Local JSON data file
    #[arg(long, env = "DAVBACKUP_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "DAVBACKUP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// Log filter (e.g. "debug", "davbackup_webdav=trace"); RUST_LOG wins when set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload the local data store to the server
    Backup,

    /// Replace the local data store with the remote backup
    Restore {
        /// Confirm that local data will be deleted before the import
        #[arg(long)]
        yes: bool,
    },

    /// Verify the server is reachable and the credentials are accepted
    Check,

    /// List a remote directory
    Ls {
        /// Directory relative to the server URL (default: the root)
        #[arg(default_value = "")]
        path: String,
    },
}

impl Config {
    /// Get the effective local data file.
    pub fn effective_data_file(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("davbackup")
                .join("store.json")
        })
    }

    /// Connection settings for a single backup or restore call.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            server_url: self.server_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            remote_path: self.remote_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_restore_with_connection_flags() {
        let config = Config::try_parse_from([
            "davbackup",
            "restore",
            "--yes",
            "--server-url",
            "https://dav.example.com/remote.php/dav",
            "--username",
            "alice",
            "--remote-path",
            "phone/backup.json",
        ])
        .unwrap();

        assert_eq!(config.command, Command::Restore { yes: true });
        let settings = config.connection_settings();
        assert_eq!(
            settings.server_url(),
            Some("https://dav.example.com/remote.php/dav")
        );
        assert_eq!(settings.resolve_remote_path().unwrap(), "phone/backup.json");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_restore_requires_explicit_flag() {
        let config = Config::try_parse_from(["davbackup", "restore"]).unwrap();
        assert_eq!(config.command, Command::Restore { yes: false });
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let config = Config::try_parse_from(["davbackup", "ls"]).unwrap();
        assert_eq!(
            config.command,
            Command::Ls {
                path: String::new()
            }
        );
    }

    #[test]
    fn test_explicit_data_file_wins() {
        let config =
            Config::try_parse_from(["davbackup", "backup", "--data-file", "/tmp/notes.json"])
                .unwrap();
        assert_eq!(config.effective_data_file(), PathBuf::from("/tmp/notes.json"));
    }
}
