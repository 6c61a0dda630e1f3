//! Transfer requests and outcomes
//!
//! A [`TransferRequest`] is built once from user input and stays immutable
//! for the whole workflow run. Validation (remote path, compression level)
//! happens at construction so the workflow never sees an invalid request.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{EntryPath, RemoteId};

/// Highest supported archive compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Compression level used when none is requested (stored, no deflate)
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 0;

/// The three entry actions the workflow supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    /// Create a new remote entry; fails if it already exists
    Upload,
    /// Fetch a remote entry into the local filesystem
    Download,
    /// Overwrite an existing remote entry
    Replace,
}

impl fmt::Display for TransferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferAction::Upload => write!(f, "upload"),
            TransferAction::Download => write!(f, "download"),
            TransferAction::Replace => write!(f, "replace"),
        }
    }
}

/// A single, validated transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    action: TransferAction,
    local_path: PathBuf,
    remote_path: EntryPath,
    is_directory: bool,
    compression_level: u32,
    delete_local_after: bool,
    mime_type_override: Option<String>,
    skip_revision: bool,
    verify_hash: bool,
    force_create_on_replace: bool,
    create_folder_tree: bool,
}

impl TransferRequest {
    /// Creates a request with every option turned off
    ///
    /// # Errors
    /// Returns error if `remote_name` has no non-empty segment
    pub fn new(
        action: TransferAction,
        local_path: impl Into<PathBuf>,
        remote_name: &str,
        is_directory: bool,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            action,
            local_path: local_path.into(),
            remote_path: EntryPath::parse(remote_name)?,
            is_directory,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            delete_local_after: false,
            mime_type_override: None,
            skip_revision: false,
            verify_hash: false,
            force_create_on_replace: false,
            create_folder_tree: false,
        })
    }

    /// Sets the archive compression level
    ///
    /// # Errors
    /// Returns error if `level` is greater than 9
    pub fn with_compression_level(mut self, level: u32) -> Result<Self, DomainError> {
        if level > MAX_COMPRESSION_LEVEL {
            return Err(DomainError::InvalidCompressionLevel(level));
        }
        self.compression_level = level;
        Ok(self)
    }

    /// Delete the local source once the transfer has succeeded
    #[must_use]
    pub fn with_delete_local_after(mut self, value: bool) -> Self {
        self.delete_local_after = value;
        self
    }

    /// Use `mime_type` instead of the default content type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type_override = mime_type;
        self
    }

    /// Overwrite the head revision on replace instead of adding one
    #[must_use]
    pub fn with_skip_revision(mut self, value: bool) -> Self {
        self.skip_revision = value;
        self
    }

    /// Compare content hashes and skip transfers that would be no-ops
    #[must_use]
    pub fn with_verify_hash(mut self, value: bool) -> Self {
        self.verify_hash = value;
        self
    }

    /// On replace, upload the entry when it does not exist yet
    #[must_use]
    pub fn with_force_create(mut self, value: bool) -> Self {
        self.force_create_on_replace = value;
        self
    }

    /// Create missing remote folders of the chain
    #[must_use]
    pub fn with_create_folder_tree(mut self, value: bool) -> Self {
        self.create_folder_tree = value;
        self
    }

    pub fn action(&self) -> TransferAction {
        self.action
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_path(&self) -> &EntryPath {
        &self.remote_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn delete_local_after(&self) -> bool {
        self.delete_local_after
    }

    pub fn mime_type_override(&self) -> Option<&str> {
        self.mime_type_override.as_deref()
    }

    pub fn skip_revision(&self) -> bool {
        self.skip_revision
    }

    pub fn verify_hash(&self) -> bool {
        self.verify_hash
    }

    pub fn force_create_on_replace(&self) -> bool {
        self.force_create_on_replace
    }

    pub fn create_folder_tree(&self) -> bool {
        self.create_folder_tree
    }
}

/// Result of a successful workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Local file or directory that was the source or destination
    pub local_path: PathBuf,
    /// Leaf name of the remote entry
    pub entry_name: String,
    /// Remote id of the entry, when known
    pub remote_id: Option<RemoteId>,
    /// False when the content already matched and no transfer was issued
    pub transferred: bool,
}
