//! Transfer workflow use case
//!
//! Runs one [`TransferRequest`] to completion:
//!
//! - **Upload / Replace** ("upsert"): resolve the folder chain (creating it
//!   when requested), look up the entry, compress directories, skip the
//!   transfer when hashes already match (replace with hash check), create or
//!   update the entry, verify the remote hash, remove the temporary archive
//!   and optionally the local source.
//! - **Download**: resolve the folder chain without creating it, look up the
//!   entry, skip the download when the local file already matches (hash
//!   check), download, verify, and expand directory archives.
//!
//! Retries belong to the repository adapter; this use case never retries.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::domain::entry::{DEFAULT_ARCHIVE_MIME_TYPE, DEFAULT_FILE_MIME_TYPE};
use crate::domain::{
    compute_file_hash, ContentHash, DomainError, RemoteEntry, RemoteId, TransferAction,
    TransferError, TransferOutcome, TransferRequest,
};
use crate::ports::{Credential, ICredentialProvider, IDirectoryArchiver, IRemoteRepository, ProgressFn};

use super::cleanup::delete_local_tree;

/// Whether an upsert creates a new entry or overwrites an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpsertMode {
    Create,
    Update,
}

/// Use case for uploading, replacing and downloading a single entry
pub struct TransferUseCase {
    repository: Arc<dyn IRemoteRepository>,
    credentials: Arc<dyn ICredentialProvider>,
    archiver: Arc<dyn IDirectoryArchiver>,
    temp_dir: Option<PathBuf>,
    progress: Option<ProgressFn>,
}

impl TransferUseCase {
    pub fn new(
        repository: Arc<dyn IRemoteRepository>,
        credentials: Arc<dyn ICredentialProvider>,
        archiver: Arc<dyn IDirectoryArchiver>,
    ) -> Self {
        Self {
            repository,
            credentials,
            archiver,
            temp_dir: None,
            progress: None,
        }
    }

    /// Directory for temporary archives; the system temp dir when `None`
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Callback receiving content transfer progress
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Runs `request` according to its action
    ///
    /// # Errors
    ///
    /// Any [`TransferError`]; the invocation stops at the first one.
    pub async fn execute(&self, request: &TransferRequest) -> Result<TransferOutcome, TransferError> {
        match request.action() {
            TransferAction::Upload => self.upsert(request, UpsertMode::Create).await,
            TransferAction::Replace => self.upsert(request, UpsertMode::Update).await,
            TransferAction::Download => self.download(request).await,
        }
    }

    // ========================================================================
    // Upload / Replace
    // ========================================================================

    async fn upsert(
        &self,
        request: &TransferRequest,
        requested: UpsertMode,
    ) -> Result<TransferOutcome, TransferError> {
        let local_path = request.local_path();
        let remote_path = request.remote_path();

        match requested {
            UpsertMode::Create => info!(
                local = %local_path.display(),
                entry = %remote_path,
                "Uploading"
            ),
            UpsertMode::Update => info!(
                local = %local_path.display(),
                entry = %remote_path,
                "Replacing"
            ),
        }
        if requested == UpsertMode::Create && request.force_create_on_replace() {
            warn!("Force option ignored on upload");
        }

        check_local_source(request)?;
        let credential = self.credential().await?;

        let parent_id = self
            .repository
            .resolve_folder_chain(
                &credential,
                remote_path.folders(),
                &RemoteId::root(),
                request.create_folder_tree(),
            )
            .await?;

        let existing = match self
            .repository
            .search(&credential, remote_path.name(), &parent_id)
            .await
        {
            Ok(entry) => Some(entry),
            Err(TransferError::ItemNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let (mode, mut entry) = match (requested, existing) {
            (UpsertMode::Create, Some(_)) => {
                return Err(TransferError::AlreadyExists(remote_path.to_string()));
            }
            (UpsertMode::Update, Some(found)) => (UpsertMode::Update, found),
            (UpsertMode::Update, None) if !request.force_create_on_replace() => {
                return Err(TransferError::ItemNotFound(remote_path.to_string()));
            }
            (UpsertMode::Update, None) => {
                debug!(entry = %remote_path, "Entry not found, switched to upload mode");
                (UpsertMode::Create, RemoteEntry::new(remote_path.name()))
            }
            (UpsertMode::Create, None) => (UpsertMode::Create, RemoteEntry::new(remote_path.name())),
        };

        entry.local_file_path = Some(local_path.to_path_buf());
        entry.mime_type = request.mime_type_override().map(str::to_string);

        if request.skip_revision() && mode == UpsertMode::Create {
            warn!("Skip revision option ignored on upload");
        } else {
            entry.skip_revision = request.skip_revision();
        }

        let mut archive: Option<TempPath> = None;
        let mut excluded = BTreeSet::new();
        if request.is_directory() {
            debug!(level = request.compression_level(), "Compressing directory");
            let path = self.temp_archive(".zip")?;
            let result = self
                .archiver
                .compress(local_path, &path, request.compression_level())
                .map_err(TransferError::Archive)?;
            for file in &result.excluded_files {
                warn!(path = %file.display(), "File not readable, left out of the archive");
            }
            excluded = result.excluded_files;
            entry.local_file_path = Some(path.to_path_buf());
            entry.default_mime_type(DEFAULT_ARCHIVE_MIME_TYPE);
            archive = Some(path);
        } else {
            entry.default_mime_type(DEFAULT_FILE_MIME_TYPE);
        }

        let result = self
            .transfer_upsert(&credential, entry, mode, &parent_id, request.verify_hash())
            .await;

        if let Some(path) = archive {
            release_temp(path);
        }
        let (entry, transferred) = result?;

        if request.delete_local_after() {
            debug!(path = %local_path.display(), "Processing local source for deletion");
            let report = delete_local_tree(local_path, &excluded);
            debug!(deleted = report.deleted, kept = report.kept, "Local source deletion finished");
        }

        Ok(TransferOutcome {
            local_path: local_path.to_path_buf(),
            entry_name: entry.name,
            remote_id: entry.remote_id,
            transferred,
        })
    }

    /// Performs the create/update call, unless the content already matches
    async fn transfer_upsert(
        &self,
        credential: &Credential,
        entry: RemoteEntry,
        mode: UpsertMode,
        parent_id: &RemoteId,
        verify_hash: bool,
    ) -> Result<(RemoteEntry, bool), TransferError> {
        let source = entry_file(&entry)?.to_path_buf();

        if mode == UpsertMode::Update && verify_hash {
            if let Some(remote) = &entry.content_hash {
                match compute_file_hash(&source) {
                    Ok(local) if local == *remote => {
                        info!(entry = %entry.name, "Remote entry already has the same content");
                        return Ok((entry, false));
                    }
                    Ok(_) => debug!(entry = %entry.name, "Content differs, replacing"),
                    Err(e) => debug!(error = %e, "Unable to hash local source, replacing"),
                }
            }
        }

        debug!(mime_type = ?entry.mime_type, "Transferring entry");
        let updated = match mode {
            UpsertMode::Create => {
                self.repository
                    .create(credential, &entry, parent_id, self.progress.clone())
                    .await?
            }
            UpsertMode::Update => {
                self.repository
                    .update(credential, &entry, self.progress.clone())
                    .await?
            }
        };

        verify_integrity(&source, updated.content_hash.as_ref())?;
        info!(entry = %updated.name, id = ?updated.remote_id, "Transfer complete");
        Ok((updated, true))
    }

    // ========================================================================
    // Download
    // ========================================================================

    async fn download(&self, request: &TransferRequest) -> Result<TransferOutcome, TransferError> {
        let local_path = request.local_path();
        let remote_path = request.remote_path();

        info!(entry = %remote_path, local = %local_path.display(), "Downloading");
        if request.delete_local_after() {
            warn!("Delete option ignored on download");
        }
        if request.mime_type_override().is_some() {
            warn!("MIME type option ignored on download");
        }
        if request.skip_revision() {
            warn!("Skip revision option ignored on download");
        }
        if request.create_folder_tree() {
            warn!("Create folders option ignored on download");
        }

        let credential = self.credential().await?;

        let parent_id = self
            .repository
            .resolve_folder_chain(&credential, remote_path.folders(), &RemoteId::root(), false)
            .await?;
        let mut entry = self
            .repository
            .search(&credential, remote_path.name(), &parent_id)
            .await?;

        let mut archive: Option<TempPath> = None;
        let mut needs_download = true;
        if request.is_directory() {
            let path = self.temp_archive(".zip")?;
            debug!(path = %path.display(), "Created temporary archive");
            entry.local_file_path = Some(path.to_path_buf());
            archive = Some(path);
        } else {
            entry.local_file_path = Some(local_path.to_path_buf());
            if request.verify_hash() && local_path.exists() {
                needs_download = !local_matches(local_path, entry.content_hash.as_ref());
                if !needs_download {
                    info!(entry = %entry.name, "Local file already has the same content");
                }
            }
        }

        let result = self
            .finish_download(&credential, entry, needs_download, request)
            .await;

        if let Some(path) = archive {
            release_temp(path);
        }
        let entry = result?;

        Ok(TransferOutcome {
            local_path: local_path.to_path_buf(),
            entry_name: entry.name,
            remote_id: entry.remote_id,
            transferred: needs_download,
        })
    }

    async fn finish_download(
        &self,
        credential: &Credential,
        entry: RemoteEntry,
        needs_download: bool,
        request: &TransferRequest,
    ) -> Result<RemoteEntry, TransferError> {
        let entry = if needs_download {
            let downloaded = self
                .repository
                .download(credential, &entry, self.progress.clone())
                .await?;
            verify_integrity(entry_file(&downloaded)?, downloaded.content_hash.as_ref())?;
            downloaded
        } else {
            entry
        };

        if request.is_directory() {
            debug!(destination = %request.local_path().display(), "Decompressing archive");
            self.archiver
                .decompress(entry_file(&entry)?, request.local_path())
                .map_err(TransferError::Archive)?;
        }

        Ok(entry)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn credential(&self) -> Result<Credential, TransferError> {
        let credential = self
            .credentials
            .get_credential()
            .await
            .map_err(TransferError::Credential)?;
        credential
            .ensure_usable()
            .map_err(TransferError::Credential)?;
        Ok(credential)
    }

    fn temp_archive(&self, suffix: &str) -> Result<TempPath, TransferError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("drivecopy").suffix(suffix);
        let file = match &self.temp_dir {
            Some(dir) => builder
                .tempfile_in(dir)
                .map_err(|e| TransferError::local_io(dir, e))?,
            None => builder
                .tempfile()
                .map_err(|e| TransferError::local_io(std::env::temp_dir(), e))?,
        };
        Ok(file.into_temp_path())
    }
}

/// Checks the local source exists and matches the requested kind
fn check_local_source(request: &TransferRequest) -> Result<(), TransferError> {
    let path = request.local_path();
    let metadata = fs::metadata(path).map_err(|e| TransferError::local_io(path, e))?;
    if request.is_directory() && !metadata.is_dir() {
        return Err(DomainError::ValidationFailed(format!(
            "'{}' is not a directory",
            path.display()
        ))
        .into());
    }
    if !request.is_directory() && !metadata.is_file() {
        return Err(DomainError::ValidationFailed(format!(
            "'{}' is not a regular file",
            path.display()
        ))
        .into());
    }
    Ok(())
}

fn entry_file(entry: &RemoteEntry) -> Result<&Path, TransferError> {
    entry.local_file().ok_or_else(|| {
        DomainError::ValidationFailed(format!("entry '{}' has no local file", entry.name)).into()
    })
}

fn local_matches(path: &Path, remote: Option<&ContentHash>) -> bool {
    let Some(remote) = remote else {
        return false;
    };
    match compute_file_hash(path) {
        Ok(local) => local == *remote,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unable to hash local file");
            false
        }
    }
}

/// Compares the local file's hash with the remote-reported one
fn verify_integrity(path: &Path, remote: Option<&ContentHash>) -> Result<(), TransferError> {
    let local = compute_file_hash(path).map_err(|e| TransferError::local_io(path, e))?;
    match remote {
        Some(remote) if *remote == local => {
            debug!(path = %path.display(), hash = %local, "Digests comparison OK");
            Ok(())
        }
        _ => Err(TransferError::Integrity {
            path: path.to_path_buf(),
            local: local.to_string(),
            remote: remote.map_or_else(|| "<none>".to_string(), ToString::to_string),
        }),
    }
}

fn release_temp(path: TempPath) {
    let shown = path.display().to_string();
    match path.close() {
        Ok(()) => debug!(path = %shown, "Deleted temporary archive"),
        Err(e) => warn!(path = %shown, error = %e, "Unable to delete temporary archive"),
    }
}
