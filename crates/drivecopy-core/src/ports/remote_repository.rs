//! Remote entry repository port (driven/secondary port)
//!
//! The repository resolves folder chains and searches, creates, updates and
//! downloads entries. Unlike the other ports it returns [`TransferError`]
//! directly: the workflow branches on `ItemNotFound` / `FolderNotFound`, so
//! adapters must classify their failures.
//!
//! Every implementation routes each remote call through its retry policy;
//! callers never retry.

use std::sync::Arc;

use crate::domain::{RemoteEntry, RemoteId, TransferError};
use crate::ports::credential_provider::Credential;

/// State of a content transfer reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferProgress {
    NotStarted,
    /// Fraction of bytes transferred, in `0.0..=1.0`
    InProgress(f64),
    Complete,
}

/// Observational progress callback
pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Port for remote entry operations
#[async_trait::async_trait]
pub trait IRemoteRepository: Send + Sync {
    /// Walks `segments` from `root_id` and returns the id of the last folder
    ///
    /// With no segments, returns `root_id` unchanged. Missing folders are
    /// created when `create_if_missing` is set; otherwise resolution fails
    /// with `FolderNotFound` at the first missing segment.
    async fn resolve_folder_chain(
        &self,
        credential: &Credential,
        segments: &[String],
        root_id: &RemoteId,
        create_if_missing: bool,
    ) -> Result<RemoteId, TransferError>;

    /// Finds the non-folder entry titled `name` directly under `parent_id`
    async fn search(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &RemoteId,
    ) -> Result<RemoteEntry, TransferError>;

    /// Uploads `entry`'s local file as a new entry under `parent_id`
    ///
    /// Returns the entry with its new id and the remote content hash.
    async fn create(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        parent_id: &RemoteId,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError>;

    /// Overwrites the content and content type of an existing entry
    async fn update(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError>;

    /// Streams the entry's content into its local file path
    ///
    /// Returns the entry with the content hash the service reported.
    async fn download(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        progress: Option<ProgressFn>,
    ) -> Result<RemoteEntry, TransferError>;
}
