//! Drive-backed remote entry repository
//!
//! Implements [`IRemoteRepository`] on top of [`DriveClient`]. Every remote
//! call runs through the [`BackoffExecutor`].
//!
//! Lookups use a list-then-filter pattern: `files.list` is asked for at most
//! [`MAX_LOOKUP_RESULTS`] items, and the single result must carry exactly the
//! requested title. Anything else is either not found or ambiguous.

use async_trait::async_trait;
use bytes::Bytes;
use drivecopy_core::domain::entry::DEFAULT_FILE_MIME_TYPE;
use drivecopy_core::domain::{ContentHash, DomainError, RemoteEntry, RemoteId, TransferError};
use drivecopy_core::ports::{Credential, IRemoteRepository, ProgressFn};
use tracing::{debug, info, warn};

use crate::backoff::BackoffExecutor;
use crate::client::{DriveClient, DriveFile};
use crate::query::{entry_query, folder_query};
use crate::upload::{FileMetadata, ParentReference};
use crate::DriveError;

/// Result cap for lookups; two is enough to tell "one" from "several"
pub const MAX_LOOKUP_RESULTS: u32 = 2;

/// Outcome of a list-then-filter lookup
#[derive(Debug)]
enum Lookup {
    Found(DriveFile),
    Missing,
    Ambiguous,
}

fn classify(items: Vec<DriveFile>, title: &str) -> Lookup {
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (None, _) => Lookup::Missing,
        (Some(_), Some(_)) => Lookup::Ambiguous,
        (Some(item), None) if item.title == title => Lookup::Found(item),
        (Some(item), None) => {
            debug!(requested = title, returned = %item.title, "Title mismatch, treating as not found");
            Lookup::Missing
        }
    }
}

/// [`IRemoteRepository`] adapter for Google Drive
#[derive(Debug, Clone)]
pub struct DriveEntryRepository {
    client: DriveClient,
    backoff: BackoffExecutor,
}

impl DriveEntryRepository {
    pub fn new(client: DriveClient, backoff: BackoffExecutor) -> Self {
        Self { client, backoff }
    }

    async fn list(&self, token: &str, q: &str) -> Result<Vec<DriveFile>, DriveError> {
        self.backoff
            .execute("files.list", || {
                self.client.list_files(token, q, MAX_LOOKUP_RESULTS)
            })
            .await
    }

    async fn get(&self, token: &str, entry: &RemoteEntry) -> Result<DriveFile, TransferError> {
        let id = remote_id(entry)?;
        self.backoff
            .execute("files.get", || self.client.get_file(token, id.as_str()))
            .await
            .map_err(|e| match e.status() {
                Some(404) => TransferError::ItemNotFound(entry.name.clone()),
                _ => e.into(),
            })
    }
}

#[async_trait]
impl IRemoteRepository for DriveEntryRepository {
    async fn resolve_folder_chain(
        &self,
        credential: &Credential,
        segments: &[String],
        root_id: &RemoteId,
        create_if_missing: bool,
    ) -> Result<RemoteId, TransferError> {
        let token = credential.access_token.as_str();
        let mut current = root_id.clone();

        for segment in segments {
            let q = folder_query(segment, &current);
            current = match classify(self.list(token, &q).await?, segment) {
                Lookup::Found(folder) => parse_id(folder.id)?,
                Lookup::Ambiguous => return Err(TransferError::AmbiguousEntry(segment.clone())),
                Lookup::Missing if create_if_missing => {
                    info!(folder = %segment, parent = %current, "Creating folder");
                    let parent = current.as_str();
                    let folder = self
                        .backoff
                        .execute("files.insert", || {
                            self.client.insert_folder(token, segment, parent)
                        })
                        .await?;
                    parse_id(folder.id)?
                }
                Lookup::Missing => return Err(TransferError::FolderNotFound(segment.clone())),
            };
            debug!(folder = %segment, id = %current, "Resolved folder");
        }

        Ok(current)
    }

    async fn search(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &RemoteId,
    ) -> Result<RemoteEntry, TransferError> {
        let q = entry_query(name, parent_id);
        match classify(self.list(&credential.access_token, &q).await?, name) {
            Lookup::Found(file) => to_entry(file, RemoteEntry::new(name)),
            Lookup::Ambiguous => Err(TransferError::AmbiguousEntry(name.to_string())),
            Lookup::Missing => Err(TransferError::ItemNotFound(name.to_string())),
        }
    }

    async fn create(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        parent_id: &RemoteId,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError> {
        let content = read_content(entry).await?;
        let metadata = FileMetadata {
            title: Some(entry.name.clone()),
            mime_type: mime_type(entry),
            parents: vec![ParentReference {
                id: parent_id.to_string(),
            }],
        };

        let token = credential.access_token.as_str();
        let file = self
            .backoff
            .execute("files.insert", || {
                self.client
                    .insert_file(token, &metadata, content.clone(), progress.clone())
            })
            .await?;

        info!(entry = %entry.name, id = %file.id, "Created entry");
        to_entry(file, entry.clone())
    }

    async fn update(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError> {
        let token = credential.access_token.as_str();
        let current = self.get(token, entry).await?;
        let content = read_content(entry).await?;
        let metadata = FileMetadata {
            title: Some(current.title.clone()),
            mime_type: mime_type(entry),
            parents: vec![],
        };
        let new_revision = !entry.skip_revision;

        let file = self
            .backoff
            .execute("files.update", || {
                self.client.update_file(
                    token,
                    &current.id,
                    &metadata,
                    content.clone(),
                    new_revision,
                    progress.clone(),
                )
            })
            .await?;

        info!(entry = %entry.name, id = %file.id, new_revision, "Updated entry");
        to_entry(file, entry.clone())
    }

    async fn download(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError> {
        let token = credential.access_token.as_str();
        let file = self.get(token, entry).await?;
        let Some(url) = file.download_url.clone() else {
            warn!(entry = %entry.name, "Entry has no downloadable content");
            return Err(TransferError::ItemNotFound(entry.name.clone()));
        };
        let target = entry
            .local_file()
            .ok_or_else(|| missing_local_file(entry))?
            .to_path_buf();

        let bytes = self
            .backoff
            .execute("download", || {
                self.client
                    .download_to(token, &url, &target, progress.clone())
            })
            .await?;

        info!(entry = %entry.name, bytes, "Downloaded entry");
        to_entry(file, entry.clone())
    }
}

fn remote_id(entry: &RemoteEntry) -> Result<&RemoteId, TransferError> {
    entry.remote_id.as_ref().ok_or_else(|| {
        DomainError::ValidationFailed(format!("entry '{}' has no remote id", entry.name)).into()
    })
}

fn missing_local_file(entry: &RemoteEntry) -> TransferError {
    DomainError::ValidationFailed(format!("entry '{}' has no local file", entry.name)).into()
}

fn mime_type(entry: &RemoteEntry) -> String {
    entry
        .mime_type
        .clone()
        .unwrap_or_else(|| DEFAULT_FILE_MIME_TYPE.to_string())
}

fn parse_id(id: String) -> Result<RemoteId, TransferError> {
    RemoteId::new(id).map_err(|e| DriveError::InvalidResponse(e.to_string()).into())
}

async fn read_content(entry: &RemoteEntry) -> Result<Bytes, TransferError> {
    let path = entry.local_file().ok_or_else(|| missing_local_file(entry))?;
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| TransferError::local_io(path, e))?;
    Ok(Bytes::from(content))
}

/// Copies the remote state of `file` onto `entry`
fn to_entry(file: DriveFile, mut entry: RemoteEntry) -> Result<RemoteEntry, TransferError> {
    entry.remote_id = Some(parse_id(file.id)?);
    if !file.title.is_empty() {
        entry.name = file.title;
    }
    if file.mime_type.is_some() {
        entry.mime_type = file.mime_type;
    }
    entry.content_hash = file.md5_checksum.and_then(|raw| match ContentHash::new(raw) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed md5Checksum");
            None
        }
    });
    Ok(entry)
}
