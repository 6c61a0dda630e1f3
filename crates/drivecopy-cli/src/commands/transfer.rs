//! Upload, download and replace commands
//!
//! Each command builds one `TransferRequest` from its flags, wires the Drive
//! repository, OAuth credentials and zip archiver into a `TransferUseCase`,
//! and reports the outcome.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use drivecopy_archive::ZipArchiver;
use drivecopy_core::config::Config;
use drivecopy_core::domain::{TransferAction, TransferRequest};
use drivecopy_core::ports::{ProgressFn, TransferProgress};
use drivecopy_core::usecases::TransferUseCase;
use drivecopy_drive::auth::{token_storage_from_config, OAuth2Config, OAuthCredentialProvider};
use drivecopy_drive::backoff::BackoffExecutor;
use drivecopy_drive::client::DriveClient;
use drivecopy_drive::repository::DriveEntryRepository;
use tracing::{debug, info};

use crate::output::{get_formatter, OutputFormat};

/// Options shared by upload, download and replace
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "directory"])))]
pub struct TransferArgs {
    /// Local file to transfer
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Local directory to transfer as a zip archive
    #[arg(short, long, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Compression level for directories (0 stores, 9 compresses most)
    #[arg(short = 'l', long, value_name = "N", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Delete the local source after a successful upload or replace
    #[arg(short = 'D', long)]
    pub delete: bool,

    /// Overwrite the current revision instead of adding a new one (replace)
    #[arg(short, long)]
    pub skip_revision: bool,

    /// Skip the transfer when local and remote MD5 already match
    #[arg(short = 'c', long)]
    pub check_hash: bool,

    /// Create the entry when replacing one that does not exist
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Create missing folders of ENTRY's path
    #[arg(short, long)]
    pub tree: bool,

    /// Content type sent to Drive
    #[arg(short, long, value_name = "TYPE")]
    pub mime_type: Option<String>,

    /// Remote entry, with '/' separating parent folders (e.g. backups/photos.zip)
    #[arg(value_name = "ENTRY")]
    pub entry: String,
}

impl TransferArgs {
    /// Builds the request for `action` from the parsed flags
    pub fn to_request(&self, action: TransferAction) -> Result<TransferRequest> {
        let (local_path, is_directory) = match (&self.file, &self.directory) {
            (Some(file), _) => (file.clone(), false),
            (None, Some(directory)) => (directory.clone(), true),
            (None, None) => anyhow::bail!("either --file or --directory is required"),
        };

        let request = TransferRequest::new(action, local_path, &self.entry, is_directory)?
            .with_compression_level(self.level)?
            .with_delete_local_after(self.delete)
            .with_mime_type(self.mime_type.clone())
            .with_skip_revision(self.skip_revision)
            .with_verify_hash(self.check_hash)
            .with_force_create(self.force)
            .with_create_folder_tree(self.tree);
        Ok(request)
    }

    pub async fn execute(
        &self,
        action: TransferAction,
        config: &Config,
        format: OutputFormat,
    ) -> Result<()> {
        let request = self.to_request(action)?;
        let use_case = build_use_case(config)?;

        info!(%action, entry = %self.entry, "Starting transfer");
        let outcome = use_case
            .execute(&request)
            .await
            .with_context(|| format!("{action} of '{}' failed", self.entry))?;

        get_formatter(format).outcome(action, &outcome);
        Ok(())
    }
}

fn build_use_case(config: &Config) -> Result<TransferUseCase> {
    let repository = DriveEntryRepository::new(
        DriveClient::with_base_url(config.drive.api_base_url.clone()),
        BackoffExecutor::from_config(&config.backoff),
    );
    let oauth = OAuth2Config::from_auth_config(&config.auth)
        .context("Set auth.client_id and auth.client_secret in the config file")?;
    let storage = token_storage_from_config(&config.auth)?;
    debug!(store = %storage.location(), "Using token store");

    Ok(TransferUseCase::new(
        Arc::new(repository),
        Arc::new(OAuthCredentialProvider::new(oauth, storage)),
        Arc::new(ZipArchiver::new()),
    )
    .with_temp_dir(config.transfer.temp_dir.clone())
    .with_progress(progress_logger()))
}

/// Logs progress once per started tenth
fn progress_logger() -> ProgressFn {
    let last_decile = Arc::new(AtomicU32::new(0));
    Arc::new(move |progress: TransferProgress| match progress {
        TransferProgress::NotStarted => {
            last_decile.store(0, Ordering::Relaxed);
            debug!("Transfer started");
        }
        TransferProgress::InProgress(fraction) => {
            let decile = (fraction.clamp(0.0, 1.0) * 10.0) as u32;
            if decile > last_decile.swap(decile, Ordering::Relaxed) {
                info!("Progress: {}%", decile * 10);
            }
        }
        TransferProgress::Complete => info!("Transfer complete"),
    })
}
