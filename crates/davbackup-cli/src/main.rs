mod config;
mod store;

use anyhow::bail;
use clap::Parser;
use davbackup_core::{BackupError, BackupService, DavError, OperationResult, ResourceKind};
use davbackup_webdav::WebDavStoreFactory;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Command, Config};
use store::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = config.connection_settings();
    let service =
        BackupService::new(WebDavStoreFactory::new().with_timeout_secs(config.timeout_secs));
    let data_file = config.effective_data_file();

    info!("davbackup {}", env!("CARGO_PKG_VERSION"));
    info!("  Data file: {}", data_file.display());
    if let Some(url) = settings.server_url() {
        info!("  Server: {}", url);
    }

    match &config.command {
        Command::Backup => {
            let store = JsonFileStore::new(&data_file);
            info!("Backing up {} local entries", store.entry_count().await?);
            let result = service.backup(&settings, &store).await;
            report(result)?;
        }
        Command::Restore { yes } => {
            if !yes {
                bail!(
                    "restore deletes all local data in {} before importing; re-run with --yes to confirm",
                    data_file.display()
                );
            }
            let store = JsonFileStore::new(&data_file);
            let result = service.restore(&settings, &store).await;
            report(result)?;
            info!("Local store now holds {} entries", store.entry_count().await?);
        }
        Command::Check => {
            let remote = service.connect(&settings).map_err(explain)?;
            remote.check_connection().await.map_err(explain_remote)?;
            println!("Connection OK");
        }
        Command::Ls { path } => {
            let remote = service.connect(&settings).map_err(explain)?;
            let entries = remote
                .list_directory(path.trim_matches('/'))
                .await
                .map_err(explain_remote)?;
            for entry in entries {
                match entry.kind {
                    ResourceKind::Directory => println!("{:>12}  {}/", "-", entry.path),
                    ResourceKind::File => match entry.size {
                        Some(size) => println!("{:>12}  {}", size, entry.path),
                        None => println!("{:>12}  {}", "?", entry.path),
                    },
                }
            }
        }
    }

    Ok(())
}

fn report(result: Result<OperationResult, BackupError>) -> anyhow::Result<()> {
    let outcome = result.map_err(explain)?;
    if let Some(message) = outcome.message {
        println!("{}", message);
    }
    Ok(())
}

/// Attach the remediation hint of the nested transport error, if any.
fn explain(err: BackupError) -> anyhow::Error {
    match err.dav_error().map(DavError::hint) {
        Some(hint) => {
            warn!("{}", hint);
            anyhow::Error::new(err).context(hint)
        }
        None => anyhow::Error::new(err),
    }
}

fn explain_remote(err: DavError) -> anyhow::Error {
    let hint = err.hint();
    warn!("{}", hint);
    anyhow::Error::new(err).context(hint)
}
